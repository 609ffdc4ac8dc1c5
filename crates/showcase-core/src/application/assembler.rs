//! Builds nested flow graphs from flat storage rows
//!
//! All grouping and sorting of children happens here: steps are grouped by
//! flow id, actions by step id, and steps are returned by ascending `order`.

use std::collections::HashMap;
use std::hash::Hash;

use crate::domain::entities::{Asset, Owner, Persona};
use crate::domain::flow::{Flow, Step, StepAction};
use crate::domain::ids::{AssetId, OwnerId, PersonaId, StepId};
use crate::domain::ordering::sort_steps;
use crate::domain::repository::{FlowPersonaRow, FlowRow, FlowRowSet, StepActionRow, StepRow, StepRowSet};
use crate::error::EntityKind;
use crate::CoreError;

/// Entity snapshots resolved for a set of rows
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    /// Owners by id
    pub owners: HashMap<OwnerId, Owner>,

    /// Personas by id
    pub personas: HashMap<PersonaId, Persona>,

    /// Assets by id
    pub assets: HashMap<AssetId, Asset>,
}

/// Parent id -> children, preserving the order rows were indexed in
struct ChildIndex<K, V> {
    children: HashMap<K, Vec<V>>,
}

impl<K: Eq + Hash, V> ChildIndex<K, V> {
    fn build(rows: Vec<V>, parent_of: impl Fn(&V) -> K) -> Self {
        let mut children: HashMap<K, Vec<V>> = HashMap::new();
        for row in rows {
            children.entry(parent_of(&row)).or_default().push(row);
        }
        Self { children }
    }

    fn take(&mut self, parent: &K) -> Vec<V> {
        self.children.remove(parent).unwrap_or_default()
    }
}

impl From<StepActionRow> for StepAction {
    fn from(row: StepActionRow) -> Self {
        StepAction {
            id: row.id,
            step_id: row.step_id,
            title: row.title,
            action_type: row.action_type,
            text: row.text,
        }
    }
}

/// Assemble flows with personas, steps, actions and resolved entities
pub fn assemble_flows(rows: FlowRowSet, refs: &ResolvedReferences) -> Result<Vec<Flow>, CoreError> {
    let mut personas = ChildIndex::build(rows.personas, |link: &FlowPersonaRow| link.flow_id);
    let mut steps = ChildIndex::build(rows.steps, |step: &StepRow| step.flow_id);
    let mut actions = ChildIndex::build(rows.actions, |action: &StepActionRow| action.step_id);

    rows.flows
        .into_iter()
        .map(|flow| {
            let flow_personas = personas.take(&flow.id);
            let flow_steps = steps.take(&flow.id);
            assemble_flow(flow, flow_personas, flow_steps, &mut actions, refs)
        })
        .collect()
}

/// Assemble steps with their actions and assets, sorted by ascending `order`
pub fn assemble_steps(rows: StepRowSet, assets: &HashMap<AssetId, Asset>) -> Result<Vec<Step>, CoreError> {
    let mut actions = ChildIndex::build(rows.actions, |action: &StepActionRow| action.step_id);
    let mut steps = rows
        .steps
        .into_iter()
        .map(|step| {
            let step_actions = actions.take(&step.id);
            assemble_step(step, step_actions, assets)
        })
        .collect::<Result<Vec<_>, _>>()?;
    sort_steps(&mut steps);
    Ok(steps)
}

fn assemble_flow(
    row: FlowRow,
    persona_links: Vec<FlowPersonaRow>,
    step_rows: Vec<StepRow>,
    actions: &mut ChildIndex<StepId, StepActionRow>,
    refs: &ResolvedReferences,
) -> Result<Flow, CoreError> {
    let owner = refs
        .owners
        .get(&row.owner_id)
        .cloned()
        .ok_or_else(|| CoreError::not_found(row.kind.owner_kind().entity_kind(), row.owner_id))?;

    let personas = persona_links
        .into_iter()
        .map(|link| {
            refs.personas
                .get(&link.persona_id)
                .cloned()
                .ok_or_else(|| CoreError::not_found(EntityKind::Persona, link.persona_id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut steps = step_rows
        .into_iter()
        .map(|step| {
            let step_actions = actions.take(&step.id);
            assemble_step(step, step_actions, &refs.assets)
        })
        .collect::<Result<Vec<_>, _>>()?;
    sort_steps(&mut steps);

    Ok(Flow {
        id: row.id,
        name: row.name,
        description: row.description,
        kind: row.kind,
        owner,
        personas,
        steps,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn assemble_step(
    row: StepRow,
    actions: Vec<StepActionRow>,
    assets: &HashMap<AssetId, Asset>,
) -> Result<Step, CoreError> {
    let asset = match row.asset_id {
        Some(asset_id) => Some(
            assets
                .get(&asset_id)
                .cloned()
                .ok_or_else(|| CoreError::not_found(EntityKind::Asset, asset_id))?,
        ),
        None => None,
    };

    Ok(Step {
        id: row.id,
        flow_id: row.flow_id,
        title: row.title,
        description: row.description,
        order: row.order,
        step_type: row.step_type,
        asset,
        actions: actions.into_iter().map(StepAction::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::OwnerKind;
    use crate::domain::flow::{FlowKind, StepKind};
    use crate::domain::ids::{FlowId, StepActionId};
    use chrono::Utc;

    fn owner() -> Owner {
        Owner {
            id: OwnerId::new(),
            kind: OwnerKind::Issuer,
            name: "Best BC College".to_string(),
            description: "College".to_string(),
            organization: None,
            logo: None,
            credential_definitions: vec![],
        }
    }

    fn asset() -> Asset {
        Asset {
            id: AssetId::new(),
            media_type: "image/png".to_string(),
            file_name: Some("step.png".to_string()),
            description: None,
            content: vec![1, 2, 3],
        }
    }

    fn flow_row(owner_id: OwnerId) -> FlowRow {
        FlowRow {
            id: FlowId::new(),
            kind: FlowKind::Issuance,
            name: "Student".to_string(),
            description: "Get a student card".to_string(),
            owner_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn step_row(flow_id: FlowId, order: i32, asset_id: Option<AssetId>) -> StepRow {
        StepRow {
            id: StepId::new(),
            flow_id,
            title: format!("Step {}", order),
            description: None,
            order,
            step_type: StepKind::HumanTask,
            asset_id,
        }
    }

    fn action_row(step_id: StepId, title: &str) -> StepActionRow {
        StepActionRow {
            id: StepActionId::new(),
            step_id,
            title: title.to_string(),
            action_type: "BUTTON".to_string(),
            text: "Next".to_string(),
        }
    }

    #[test]
    fn test_assemble_flows_groups_children_by_parent() {
        let owner = owner();
        let asset = asset();
        let first = flow_row(owner.id);
        let second = flow_row(owner.id);

        let step_a = step_row(first.id, 2, Some(asset.id));
        let step_b = step_row(first.id, 1, None);
        let step_c = step_row(second.id, 1, None);

        let rows = FlowRowSet {
            flows: vec![first.clone(), second.clone()],
            personas: vec![],
            steps: vec![step_a.clone(), step_c.clone(), step_b.clone()],
            actions: vec![
                action_row(step_a.id, "a1"),
                action_row(step_b.id, "b1"),
                action_row(step_a.id, "a2"),
                action_row(step_c.id, "c1"),
            ],
        };

        let mut refs = ResolvedReferences::default();
        refs.owners.insert(owner.id, owner.clone());
        refs.assets.insert(asset.id, asset.clone());

        let flows = assemble_flows(rows, &refs).unwrap();
        assert_eq!(flows.len(), 2);

        let orders: Vec<i32> = flows[0].steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(flows[0].steps[1].asset.as_ref(), Some(&asset));
        let titles: Vec<&str> = flows[0].steps[1].actions.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a1", "a2"]);

        assert_eq!(flows[1].steps.len(), 1);
        assert_eq!(flows[1].steps[0].actions[0].title, "c1");
        assert_eq!(flows[1].owner, owner);
    }

    #[test]
    fn test_missing_owner_snapshot_is_not_found() {
        let row = flow_row(OwnerId::new());
        let owner_id = row.owner_id;
        let rows = FlowRowSet {
            flows: vec![row],
            ..Default::default()
        };

        let result = assemble_flows(rows, &ResolvedReferences::default());
        assert_eq!(result.unwrap_err(), CoreError::not_found(EntityKind::Issuer, owner_id));
    }

    #[test]
    fn test_assemble_steps_sorts_by_order() {
        let flow_id = FlowId::new();
        let rows = StepRowSet {
            steps: vec![
                step_row(flow_id, 3, None),
                step_row(flow_id, 1, None),
                step_row(flow_id, 2, None),
            ],
            actions: vec![],
        };

        let steps = assemble_steps(rows, &HashMap::new()).unwrap();
        let orders: Vec<i32> = steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert!(steps.iter().all(|s| s.actions.is_empty()));
    }
}
