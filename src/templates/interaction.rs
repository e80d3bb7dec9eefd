//! Executes a bound object's behaviour for a player.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::binder::BoundMap;
use crate::model::Metadata;

pub const DEFAULT_PLAYER_NAME: &str = "Explorador";
pub const DEFAULT_ACTION: &str = "interact";
const PLAYER_TOKEN: &str = "{player}";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Player {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            alias: None,
            name: Some(name.into()),
        }
    }

    /// Alias, else name, else the generic explorer name.
    pub fn display_name(&self) -> &str {
        [self.alias.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
            .unwrap_or(DEFAULT_PLAYER_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub message: String,
    pub object_id: String,
    pub object_name: String,
    pub map_id: Option<String>,
    pub action: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<InteractionEvent>,
    pub broadcast: bool,
    pub effects: Vec<Value>,
    pub message: String,
}

impl InteractionOutcome {
    fn failed(message: &str) -> Self {
        Self {
            ok: false,
            event: None,
            broadcast: false,
            effects: Vec::new(),
            message: message.to_string(),
        }
    }
}

/// Runs `action` on `object_id`. Not-ok when the object is unknown or has
/// no behaviour; never an error.
pub fn execute_interaction(
    bound: &BoundMap,
    object_id: &str,
    player: &Player,
    action: &str,
) -> InteractionOutcome {
    let Some(object) = bound.get(object_id) else {
        log::debug!("interaction on unknown object `{object_id}`");
        return InteractionOutcome::failed("El objeto no está disponible.");
    };
    let Some(behaviour) = &object.runtime.behaviour else {
        return InteractionOutcome::failed("El objeto no responde.");
    };
    let public = &object.public;

    let template = Some(behaviour.message.trim())
        .filter(|m| !m.is_empty())
        .unwrap_or(behaviour.description.as_str());
    let message = template.replace(PLAYER_TOKEN, player.display_name());

    let mut metadata = behaviour.metadata.clone();
    for (key, value) in &public.metadata {
        metadata.insert(key.clone(), value.clone());
    }

    let non_empty = |s: &str, fallback: &str| {
        if s.is_empty() {
            fallback.to_string()
        } else {
            s.to_string()
        }
    };
    let event = InteractionEvent {
        kind: non_empty(&behaviour.kind, "message"),
        title: non_empty(&behaviour.title, &public.name),
        description: non_empty(&behaviour.description, &message),
        message: message.clone(),
        object_id: public.id.clone(),
        object_name: public.name.clone(),
        map_id: Some(bound.map.id.clone()),
        action: non_empty(action, DEFAULT_ACTION),
        metadata,
    };
    log::info!(
        "{} ran `{}` on `{}` in `{}`",
        player.display_name(),
        event.action,
        public.id,
        bound.map.id
    );

    InteractionOutcome {
        ok: true,
        event: Some(event),
        broadcast: behaviour.broadcast,
        effects: behaviour.effects.clone(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectTemplate;
    use crate::processor::{CompileOptions, compile_mdl};
    use crate::templates::binder::bind_objects;
    use crate::templates::registry::TemplateSet;
    use serde_json::json;

    fn bound() -> BoundMap {
        let map = compile_mdl(
            "id: plaza\ndimensions: 4x4\n[Objects]\nsign@1x1\nrock@2x2\n",
            &CompileOptions::new(),
        )
        .expect("compile");
        let sign = ObjectTemplate::from_value(
            &json!({
                "id": "sign",
                "name": "Cartel",
                "behavior": {
                    "message": "Hola {player}, {player}!",
                    "broadcast": true,
                    "effects": [{ "type": "sparkle" }],
                    "metadata": { "tone": "friendly" }
                },
                "metadata": { "category": "info" }
            }),
            None,
        )
        .expect("template");
        bind_objects(&map, &TemplateSet::from_templates([sign]))
    }

    #[test]
    fn test_player_name_fallbacks() {
        let mut player = Player::default();
        assert_eq!(player.display_name(), DEFAULT_PLAYER_NAME);
        player.name = Some("Ana".into());
        assert_eq!(player.display_name(), "Ana");
        player.alias = Some("  ".into());
        assert_eq!(player.display_name(), "Ana");
        player.alias = Some("Nube".into());
        assert_eq!(player.display_name(), "Nube");
    }

    #[test]
    fn test_interaction_event() {
        let outcome = execute_interaction(&bound(), "sign", &Player::named("Ana"), "read");
        assert!(outcome.ok);
        assert!(outcome.broadcast);
        assert_eq!(outcome.message, "Hola Ana, Ana!");
        assert_eq!(outcome.effects, vec![json!({ "type": "sparkle" })]);

        let event = outcome.event.expect("event");
        assert_eq!(event.kind, "message");
        assert_eq!(event.title, "Cartel");
        assert_eq!(event.object_id, "sign");
        assert_eq!(event.map_id.as_deref(), Some("plaza"));
        assert_eq!(event.action, "read");
        assert_eq!(event.metadata["tone"], "friendly");
        assert_eq!(event.metadata["category"], "info");
        assert_eq!(event.metadata["objectId"], "sign");
    }

    #[test]
    fn test_missing_object_or_behaviour_is_not_ok() {
        let bound = bound();
        let missing = execute_interaction(&bound, "ghost", &Player::default(), DEFAULT_ACTION);
        assert!(!missing.ok);
        assert!(missing.event.is_none());

        let silent = execute_interaction(&bound, "rock", &Player::default(), DEFAULT_ACTION);
        assert!(!silent.ok);
    }
}
