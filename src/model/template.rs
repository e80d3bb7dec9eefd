//! Object templates and the interaction/appearance data they carry.
//!
//! Template files are loose JSON, so every `from_value` here is tolerant:
//! wrong types and blank strings read as "absent" instead of failing.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Metadata;

/// Trimmed string, `None` when missing, blank or not a string.
pub(crate) fn clean_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn object_of(value: Option<&Value>) -> Option<Metadata> {
    value.and_then(Value::as_object).cloned()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Sanitised rendering hints for a placement or template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    pub generator: String,
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    #[serde(default)]
    pub options: Metadata,
    pub anchor: Vec2,
    pub offset: Vec2,
    pub scale: Vec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Appearance {
    const GENERATOR_KEYS: [&'static str; 7] =
        ["generator", "draw", "renderer", "type", "id", "name", "kind"];

    /// Returns `None` unless `raw` is an object naming a generator.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let generator = Self::GENERATOR_KEYS
            .iter()
            .find_map(|key| clean_str(obj.get(*key)))?;

        let dimension = |keys: [&str; 2], fallback: f64| {
            keys.iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_f64))
                .unwrap_or(fallback)
                .trunc()
                .max(1.0) as u32
        };
        let tile_size = ["tileSize", "tile_size", "pixelSize"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_f64))
            .unwrap_or(16.0)
            .trunc()
            .max(4.0) as u32;

        Some(Self {
            generator,
            width: dimension(["width", "columns"], 1.0),
            height: dimension(["height", "rows"], 1.0),
            tile_size,
            options: object_of(obj.get("options")).unwrap_or_default(),
            anchor: sanitize_anchor(obj.get("anchor")),
            offset: sanitize_offset(obj.get("offset").or_else(|| obj.get("positionOffset"))),
            scale: sanitize_scale(obj.get("scale")),
            variant: clean_str(obj.get("variant")),
        })
    }
}

fn number(obj: &Metadata, key: &str, fallback: f64) -> f64 {
    obj.get(key)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .unwrap_or(fallback)
}

fn sanitize_anchor(raw: Option<&Value>) -> Vec2 {
    match raw.and_then(Value::as_object) {
        Some(obj) => Vec2::new(
            number(obj, "x", 0.5).clamp(0.0, 1.0),
            number(obj, "y", 1.0).clamp(0.0, 1.5),
        ),
        None => Vec2::new(0.5, 1.0),
    }
}

fn sanitize_offset(raw: Option<&Value>) -> Vec2 {
    match raw.and_then(Value::as_object) {
        Some(obj) => Vec2::new(number(obj, "x", 0.0), number(obj, "y", 0.0)),
        None => Vec2::new(0.0, 0.0),
    }
}

fn sanitize_scale(raw: Option<&Value>) -> Vec2 {
    match raw {
        Some(Value::Number(n)) => {
            let v = n.as_f64().unwrap_or(1.0).clamp(0.1, 6.0);
            Vec2::new(v, v)
        }
        Some(Value::Object(obj)) => Vec2::new(
            number(obj, "x", 1.0).clamp(0.1, 6.0),
            number(obj, "y", 1.0).clamp(0.1, 6.0),
        ),
        _ => Vec2::new(1.0, 1.0),
    }
}

/// Partially specified interaction, as authored on an instance or template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl InteractionSpec {
    pub fn from_value(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        Some(Self {
            kind: clean_str(obj.get("type")),
            title: clean_str(obj.get("title")),
            description: clean_str(obj.get("description")),
            message: clean_str(obj.get("message")).or_else(|| clean_str(obj.get("text"))),
            icon: clean_str(obj.get("icon")),
            animation: clean_str(obj.get("animation")),
            metadata: object_of(obj.get("metadata")),
        })
    }

    /// Fills every missing field; `message` falls back to the description.
    pub fn resolve(
        spec: Option<&InteractionSpec>,
        fallback_title: &str,
        fallback_description: &str,
    ) -> Interaction {
        let spec = spec.cloned().unwrap_or_default();
        let description = spec
            .description
            .unwrap_or_else(|| fallback_description.to_string());
        let message = spec
            .message
            .or_else(|| Some(description.clone()))
            .filter(|m| !m.is_empty());
        Interaction {
            kind: spec.kind.unwrap_or_else(|| "message".into()),
            title: spec.title.unwrap_or_else(|| fallback_title.to_string()),
            description,
            message,
            icon: spec.icon,
            animation: spec.animation,
            metadata: spec.metadata,
        }
    }
}

/// Client-safe, fully resolved interaction prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Server-side behaviour: an interaction plus broadcast and effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviourSpec {
    #[serde(flatten)]
    pub interaction: InteractionSpec,
    #[serde(default)]
    pub broadcast: bool,
    #[serde(default)]
    pub effects: Vec<Value>,
}

impl BehaviourSpec {
    pub fn from_value(raw: &Value) -> Option<Self> {
        let interaction = InteractionSpec::from_value(raw)?;
        Some(Self {
            interaction,
            broadcast: raw.get("broadcast").is_some_and(truthy),
            effects: raw
                .get("effects")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        })
    }

    pub fn resolve(
        spec: Option<&BehaviourSpec>,
        fallback_title: &str,
        fallback_description: &str,
    ) -> Behaviour {
        let Some(spec) = spec else {
            return Behaviour {
                kind: "message".into(),
                title: fallback_title.to_string(),
                description: fallback_description.to_string(),
                message: fallback_description.to_string(),
                broadcast: false,
                effects: Vec::new(),
                metadata: Metadata::new(),
            };
        };
        let interaction = InteractionSpec::resolve(
            Some(&spec.interaction),
            fallback_title,
            fallback_description,
        );
        Behaviour {
            message: interaction
                .message
                .unwrap_or_else(|| interaction.description.clone()),
            kind: interaction.kind,
            title: interaction.title,
            description: interaction.description,
            broadcast: spec.broadcast,
            effects: spec.effects.clone(),
            metadata: interaction.metadata.unwrap_or_default(),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Behaviour {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub message: String,
    pub broadcast: bool,
    pub effects: Vec<Value>,
    pub metadata: Metadata,
}

/// Read-only template loaded from a `.obj` file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub interaction: Option<InteractionSpec>,
    pub behaviour: Option<BehaviourSpec>,
    pub appearance: Option<Appearance>,
    pub metadata: Metadata,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl ObjectTemplate {
    /// Shape: `{id, name, description, interaction|behavior, metadata, appearance}`.
    pub fn from_value(raw: &Value, source: Option<PathBuf>) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| anyhow!("template must be a JSON object"))?;
        let id = clean_str(obj.get("id")).ok_or_else(|| anyhow!("template has no valid `id`"))?;
        let name = clean_str(obj.get("name")).unwrap_or_else(|| id.clone());
        let description = clean_str(obj.get("description")).unwrap_or_default();

        let interaction = obj
            .get("interaction")
            .or_else(|| obj.get("behavior"))
            .and_then(InteractionSpec::from_value);
        let behaviour = obj
            .get("behavior")
            .or_else(|| obj.get("behaviour"))
            .or_else(|| obj.get("interaction"))
            .and_then(BehaviourSpec::from_value);
        let appearance = obj
            .get("appearance")
            .or_else(|| obj.get("sprite"))
            .and_then(Appearance::from_value);

        Ok(Self {
            id,
            name,
            description,
            interaction,
            behaviour,
            appearance,
            metadata: object_of(obj.get("metadata")).unwrap_or_default(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_appearance_is_clamped() {
        let raw = json!({
            "generator": "lamp",
            "width": 0,
            "tileSize": 2,
            "anchor": { "x": 3, "y": -1 },
            "scale": 12
        });
        let a = Appearance::from_value(&raw).expect("appearance");
        assert_eq!(a.generator, "lamp");
        assert_eq!(a.width, 1);
        assert_eq!(a.height, 1);
        assert_eq!(a.tile_size, 4);
        assert_eq!(a.anchor, Vec2::new(1.0, 0.0));
        assert_eq!(a.scale, Vec2::new(6.0, 6.0));
        assert_eq!(a.offset, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_appearance_needs_generator() {
        assert!(Appearance::from_value(&json!({ "width": 2 })).is_none());
        assert!(Appearance::from_value(&json!("lamp")).is_none());
    }

    #[test]
    fn test_interaction_backfills_from_fallbacks() {
        let spec = InteractionSpec {
            title: Some("Custom".into()),
            ..Default::default()
        };
        let resolved = InteractionSpec::resolve(Some(&spec), "Lamp", "A lamp");
        assert_eq!(resolved.kind, "message");
        assert_eq!(resolved.title, "Custom");
        assert_eq!(resolved.description, "A lamp");
        assert_eq!(resolved.message.as_deref(), Some("A lamp"));
    }

    #[test]
    fn test_missing_behaviour_uses_defaults() {
        let b = BehaviourSpec::resolve(None, "Lamp", "Bright");
        assert_eq!(b.message, "Bright");
        assert!(!b.broadcast);
        assert!(b.effects.is_empty());
    }

    #[test]
    fn test_template_falls_back_to_behavior_for_interaction() {
        let raw = json!({
            "id": " sign ",
            "behavior": { "message": "Hola {player}", "broadcast": true, "effects": ["glow"] }
        });
        let t = ObjectTemplate::from_value(&raw, None).expect("template");
        assert_eq!(t.id, "sign");
        assert_eq!(t.name, "sign");
        let interaction = t.interaction.expect("interaction");
        assert_eq!(interaction.message.as_deref(), Some("Hola {player}"));
        let behaviour = t.behaviour.expect("behaviour");
        assert!(behaviour.broadcast);
        assert_eq!(behaviour.effects, vec![json!("glow")]);
    }

    #[test]
    fn test_template_without_id_is_rejected() {
        let err = ObjectTemplate::from_value(&json!({ "name": "x" }), None).unwrap_err();
        assert!(err.to_string().contains("id"), "got: {err}");
    }
}
