use anyhow::{Context, Result, anyhow};
use geo_types::{Geometry, GeometryCollection};
use geojson::{GeoJson, JsonObject, JsonValue, feature::Id};
use log::warn;
use roadclean::{AttrValue, Attributes, Edge, EdgeId, Feature};
use std::path::Path;

pub fn read_features(path: &Path, id_field: Option<&str>) -> Result<Vec<Feature>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_features(&text, id_field).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_features(text: &str, id_field: Option<&str>) -> Result<Vec<Feature>> {
    let features = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(anyhow!("expected a FeatureCollection, found a bare geometry"));
        }
    };

    features
        .into_iter()
        .enumerate()
        .map(|(position, f)| -> Result<Feature> {
            let properties = f.properties.unwrap_or_default();
            let id = feature_id(position, f.id.as_ref(), &properties, id_field)?;
            let attributes: Attributes = properties
                .into_iter()
                .map(|(k, v)| (k, json_to_attr(v)))
                .collect();

            let geometry = match f.geometry {
                Some(g) => Geometry::<f64>::try_from(g.value).unwrap_or_else(|e| {
                    warn!("Feature {}: unreadable geometry: {}", id, e);
                    Geometry::GeometryCollection(GeometryCollection::default())
                }),
                // reported as malformed by the cleaner
                None => Geometry::GeometryCollection(GeometryCollection::default()),
            };

            Ok(Feature::new(id, attributes, geometry))
        })
        .collect()
}

fn feature_id(
    position: usize,
    id: Option<&Id>,
    properties: &JsonObject,
    id_field: Option<&str>,
) -> Result<EdgeId> {
    if let Some(field) = id_field {
        return match properties.get(field) {
            Some(JsonValue::Number(n)) => n.as_i64(),
            Some(JsonValue::String(s)) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| anyhow!("feature {} has no integer '{}' property", position, field));
    }

    let from_feature = match id {
        Some(Id::Number(n)) => n.as_i64(),
        Some(Id::String(s)) => s.parse().ok(),
        None => None,
    };
    Ok(from_feature.unwrap_or(position as EdgeId))
}

fn json_to_attr(value: JsonValue) -> AttrValue {
    match value {
        JsonValue::Null => AttrValue::Null,
        JsonValue::Bool(b) => AttrValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttrValue::Int(i),
            None => AttrValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttrValue::Text(s),
        JsonValue::Array(values) => AttrValue::List(values.into_iter().map(json_to_attr).collect()),
        other @ JsonValue::Object(_) => AttrValue::Text(other.to_string()),
    }
}

pub fn edges_to_geojson(edges: &[Edge]) -> Result<GeoJson> {
    let features = edges
        .iter()
        .map(|edge| -> Result<geojson::Feature> {
            let mut properties = JsonObject::new();
            for (key, value) in &edge.attributes {
                properties.insert(key.clone(), serde_json::to_value(value)?);
            }

            Ok(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&edge.geometry))),
                id: Some(Id::Number(edge.id.into())),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect::<Result<Vec<geojson::Feature>>>()?;

    Ok(GeoJson::from(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }))
}
