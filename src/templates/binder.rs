//! Binds map placements to object templates.
//!
//! Precedence, first present wins and nothing is deep-merged:
//!
//!   appearance   instance field > `metadata.appearance` > template
//!   name         instance > template > placement id
//!   description  `metadata.description` > template > ""
//!   interaction  instance field > `metadata.interaction` > template
//!   behaviour    `metadata.behaviour` > template > resolved interaction

use serde::Serialize;
use serde_json::Value;

use super::registry::TemplateSet;
use crate::model::template::clean_str;
use crate::model::{
    Appearance, Behaviour, BehaviourSpec, Interaction, InteractionSpec, MapModel, Metadata,
    ObjectPlacement, ObjectTemplate, Position, Size,
};

/// Client-safe view of one placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicObject {
    pub id: String,
    pub name: String,
    pub description: String,
    pub solid: bool,
    pub position: Position,
    pub size: Size,
    pub metadata: Metadata,
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appearance: Option<Appearance>,
    pub interaction: Interaction,
}

/// Server-only data kept next to each public object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeRecord {
    pub definition_id: Option<String>,
    /// `None` when nothing about the placement can respond to a player.
    pub behaviour: Option<Behaviour>,
    /// Template metadata only.
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundObject {
    pub public: PublicObject,
    pub runtime: RuntimeRecord,
}

/// A map with every placement resolved against one template snapshot.
#[derive(Debug, Clone)]
pub struct BoundMap {
    pub map: MapModel,
    pub objects: Vec<BoundObject>,
}

impl BoundMap {
    pub fn get(&self, id: &str) -> Option<&BoundObject> {
        self.objects.iter().find(|o| o.public.id == id)
    }

    /// The map as sent to clients: the model with `objects` swapped for the
    /// public views.
    pub fn public_view(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(&self.map)?;
        let objects: Vec<&PublicObject> = self.objects.iter().map(|o| &o.public).collect();
        if let Value::Object(map) = &mut value {
            map.insert("objects".into(), serde_json::to_value(objects)?);
        }
        Ok(value)
    }
}

/// A template's interaction with its own name and description filled in.
fn template_interaction(template: &ObjectTemplate) -> Interaction {
    InteractionSpec::resolve(
        template.interaction.as_ref(),
        &template.name,
        &template.description,
    )
}

fn template_behaviour(template: &ObjectTemplate) -> Behaviour {
    let interaction = template_interaction(template);
    let description = if template.description.is_empty() {
        interaction.description.as_str()
    } else {
        template.description.as_str()
    };
    BehaviourSpec::resolve(template.behaviour.as_ref(), &template.name, description)
}

fn bind_object(placement: &ObjectPlacement, templates: &TemplateSet) -> BoundObject {
    let reference = placement.template_ref().map(str::to_string);
    let template = reference.as_deref().and_then(|id| templates.get(id));
    if reference.is_some() && template.is_none() {
        log::debug!(
            "placement `{}` references unknown template {:?}",
            placement.id,
            reference
        );
    }
    let meta = &placement.metadata;

    let appearance = placement
        .appearance
        .clone()
        .or_else(|| meta.get("appearance").and_then(Appearance::from_value))
        .or_else(|| template.and_then(|t| t.appearance.clone()));

    let name = Some(placement.name.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| template.map(|t| t.name.clone()))
        .unwrap_or_else(|| placement.id.clone());
    let description = clean_str(meta.get("description"))
        .or_else(|| template.map(|t| t.description.clone()))
        .unwrap_or_default();

    let instance_interaction = placement
        .interaction
        .clone()
        .or_else(|| meta.get("interaction").and_then(InteractionSpec::from_value));
    let interaction = match (&instance_interaction, template) {
        (Some(spec), _) => InteractionSpec::resolve(Some(spec), &name, &description),
        (None, Some(t)) => template_interaction(t),
        (None, None) => InteractionSpec::resolve(None, &name, &description),
    };

    let behaviour_override = meta
        .get("behaviour")
        .or_else(|| meta.get("behavior"))
        .and_then(BehaviourSpec::from_value);
    let behaviour = match (&behaviour_override, template) {
        (Some(spec), _) => Some(BehaviourSpec::resolve(
            Some(spec),
            &interaction.title,
            &interaction.description,
        )),
        (None, Some(t)) => Some(template_behaviour(t)),
        (None, None) if instance_interaction.is_some() => Some(BehaviourSpec::resolve(
            None,
            &interaction.title,
            &interaction.description,
        )),
        (None, None) => None,
    };

    let mut metadata = template.map(|t| t.metadata.clone()).unwrap_or_default();
    for (key, value) in meta {
        metadata.insert(key.clone(), value.clone());
    }
    if let Some(reference) = &reference {
        metadata.insert("objectId".into(), Value::String(reference.clone()));
    }

    BoundObject {
        public: PublicObject {
            id: placement.id.clone(),
            name,
            description,
            solid: placement.solid,
            position: placement.position,
            size: placement.size,
            metadata,
            object_id: reference.clone().or_else(|| template.map(|t| t.id.clone())),
            appearance,
            interaction,
        },
        runtime: RuntimeRecord {
            definition_id: template.map(|t| t.id.clone()).or(reference),
            behaviour,
            metadata: template.map(|t| t.metadata.clone()).unwrap_or_default(),
        },
    }
}

/// Resolves every placement of `map` against `templates`. The model itself
/// is not touched; the bound map carries its own copy.
pub fn bind_objects(map: &MapModel, templates: &TemplateSet) -> BoundMap {
    let objects: Vec<BoundObject> = map
        .objects
        .iter()
        .map(|placement| bind_object(placement, templates))
        .collect();
    let bound = objects
        .iter()
        .filter(|o| o.runtime.definition_id.is_some())
        .count();
    log::debug!(
        "map `{}`: {bound}/{} placements bound to templates",
        map.id,
        objects.len()
    );
    BoundMap {
        map: map.clone(),
        objects,
    }
}
