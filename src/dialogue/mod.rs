//! Dialogue trees: NPCs talk in nodes, the player picks among choices, and
//! entering a node may hand out items or send the NPC walking.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::input::PlayerInput;
use crate::interact::Interactable;
use crate::inventory::Inventory;
use crate::shared::*;

pub struct DialoguePlugin;

impl Plugin for DialoguePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DialogueRegistry>()
            .init_resource::<ActiveDialogue>()
            .add_systems(Update, start_dialogue.run_if(in_state(GameState::Playing)))
            .add_systems(
                Update,
                advance_dialogue.run_if(in_state(GameState::Dialogue)),
            );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TREES
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum DialogueAction {
    GiveItem { item_id: ItemId, quantity: u32 },
    TakeItem { item_id: ItemId, quantity: u32 },
    /// Offsets from the NPC's position when the node is entered, walked in
    /// order. Each offset is relative to the previous waypoint.
    Walk(Vec<Vec2>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueChoice {
    pub text: String,
    pub next: Option<String>,
    /// Hidden unless the player carries this item.
    pub requires_item: Option<ItemId>,
}

impl DialogueChoice {
    pub fn new(text: impl Into<String>, next: Option<&str>) -> Self {
        Self {
            text: text.into(),
            next: next.map(str::to_string),
            requires_item: None,
        }
    }

    pub fn requiring(mut self, item_id: impl Into<ItemId>) -> Self {
        self.requires_item = Some(item_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogueNode {
    pub speaker: String,
    pub text: String,
    pub choices: Vec<DialogueChoice>,
    /// Followed when the node has no choices. `None` ends the conversation.
    pub next: Option<String>,
    pub actions: Vec<DialogueAction>,
}

impl DialogueNode {
    pub fn line(speaker: impl Into<String>, text: impl Into<String>, next: Option<&str>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            next: next.map(str::to_string),
            ..default()
        }
    }

    pub fn with_choices(mut self, choices: Vec<DialogueChoice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_actions(mut self, actions: Vec<DialogueAction>) -> Self {
        self.actions = actions;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueTree {
    pub id: String,
    pub start: String,
    pub nodes: HashMap<String, DialogueNode>,
}

impl DialogueTree {
    pub fn new(id: impl Into<String>, start: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: start.into(),
            nodes: HashMap::new(),
        }
    }

    pub fn node(mut self, id: impl Into<String>, node: DialogueNode) -> Self {
        self.nodes.insert(id.into(), node);
        self
    }
}

#[derive(Resource, Debug, Default)]
pub struct DialogueRegistry {
    pub trees: HashMap<String, DialogueTree>,
}

impl DialogueRegistry {
    pub fn register(&mut self, tree: DialogueTree) {
        self.trees.insert(tree.id.clone(), tree);
    }

    pub fn get(&self, id: &str) -> Option<&DialogueTree> {
        self.trees.get(id)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueSession {
    pub npc: Entity,
    pub tree_id: String,
    pub node_id: String,
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogueStep {
    /// Moved to a new node; these are its entry actions.
    Continue(Vec<DialogueAction>),
    End,
}

impl DialogueSession {
    /// Opens `tree` at its start node. Returns the start node's actions too.
    pub fn start(tree: &DialogueTree, npc: Entity) -> Option<(Self, Vec<DialogueAction>)> {
        let node = tree.nodes.get(&tree.start)?;
        let session = Self {
            npc,
            tree_id: tree.id.clone(),
            node_id: tree.start.clone(),
            cursor: 0,
        };
        Some((session, node.actions.clone()))
    }

    pub fn node<'a>(&self, tree: &'a DialogueTree) -> Option<&'a DialogueNode> {
        tree.nodes.get(&self.node_id)
    }

    /// Choices the player may pick right now, in authored order.
    pub fn visible_choices<'a>(
        &self,
        tree: &'a DialogueTree,
        inventory: &Inventory,
    ) -> Vec<&'a DialogueChoice> {
        self.node(tree)
            .map(|node| {
                node.choices
                    .iter()
                    .filter(|c| c.requires_item.as_ref().map_or(true, |id| inventory.has_item(id)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Moves the choice cursor, wrapping at both ends.
    pub fn move_cursor(&mut self, delta: i32, choice_count: usize) {
        if choice_count == 0 {
            self.cursor = 0;
            return;
        }
        let count = choice_count as i32;
        self.cursor = (self.cursor as i32 + delta).rem_euclid(count) as usize;
    }

    /// Confirms the current node: follows the selected choice, or `next`
    /// when there is nothing to choose.
    pub fn advance(&mut self, tree: &DialogueTree, inventory: &Inventory) -> DialogueStep {
        let Some(node) = self.node(tree) else {
            return DialogueStep::End;
        };
        let choices = self.visible_choices(tree, inventory);
        let next = if choices.is_empty() {
            node.next.clone()
        } else {
            choices
                .get(self.cursor.min(choices.len() - 1))
                .and_then(|choice| choice.next.clone())
        };

        let Some(next) = next else {
            return DialogueStep::End;
        };
        let Some(next_node) = tree.nodes.get(&next) else {
            warn!("[Dialogue] tree '{}' has no node '{}'", tree.id, next);
            return DialogueStep::End;
        };
        self.node_id = next;
        self.cursor = 0;
        DialogueStep::Continue(next_node.actions.clone())
    }
}

#[derive(Resource, Debug, Default)]
pub struct ActiveDialogue {
    pub session: Option<DialogueSession>,
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

fn apply_actions(
    actions: Vec<DialogueAction>,
    npc: Entity,
    npcs: &mut Query<(&LogicalPosition, &mut Interactable)>,
    pickups: &mut EventWriter<ItemPickupEvent>,
    removals: &mut EventWriter<ItemRemovedEvent>,
) {
    for action in actions {
        match action {
            DialogueAction::GiveItem { item_id, quantity } => {
                pickups.send(ItemPickupEvent { item_id, quantity });
            }
            DialogueAction::TakeItem { item_id, quantity } => {
                removals.send(ItemRemovedEvent { item_id, quantity });
            }
            DialogueAction::Walk(offsets) => {
                let Ok((pos, mut interactable)) = npcs.get_mut(npc) else {
                    continue;
                };
                if let Interactable::Npc(walker) = interactable.as_mut() {
                    let mut at = walker.waypoints.back().copied().unwrap_or(pos.0);
                    walker.queue_walk(offsets.into_iter().map(|offset| {
                        at += offset;
                        at
                    }));
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn start_dialogue(
    mut events: EventReader<DialogueStartEvent>,
    registry: Res<DialogueRegistry>,
    mut active: ResMut<ActiveDialogue>,
    mut next_state: ResMut<NextState<GameState>>,
    mut npcs: Query<(&LogicalPosition, &mut Interactable)>,
    mut pickups: EventWriter<ItemPickupEvent>,
    mut removals: EventWriter<ItemRemovedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    let Some(event) = events.read().last().cloned() else {
        return;
    };
    let Some(tree) = registry.get(&event.tree_id) else {
        warn!("[Dialogue] unknown tree '{}'", event.tree_id);
        toasts.send(ToastEvent::new("..."));
        return;
    };
    let Some((session, actions)) = DialogueSession::start(tree, event.npc) else {
        warn!("[Dialogue] tree '{}' has no start node '{}'", tree.id, tree.start);
        return;
    };

    debug!("[Dialogue] start '{}'", tree.id);
    apply_actions(actions, event.npc, &mut npcs, &mut pickups, &mut removals);
    active.session = Some(session);
    next_state.set(GameState::Dialogue);
}

#[allow(clippy::too_many_arguments)]
pub fn advance_dialogue(
    input: Res<PlayerInput>,
    registry: Res<DialogueRegistry>,
    inventory: Res<Inventory>,
    mut active: ResMut<ActiveDialogue>,
    mut next_state: ResMut<NextState<GameState>>,
    mut npcs: Query<(&LogicalPosition, &mut Interactable)>,
    mut pickups: EventWriter<ItemPickupEvent>,
    mut removals: EventWriter<ItemRemovedEvent>,
    mut end_events: EventWriter<DialogueEndEvent>,
    mut sfx: EventWriter<PlaySfxEvent>,
) {
    let step = match active.session.as_mut() {
        Some(session) => match registry.get(&session.tree_id) {
            Some(tree) => {
                let choice_count = session.visible_choices(tree, &inventory).len();
                if input.ui_up {
                    session.move_cursor(-1, choice_count);
                    sfx.send(PlaySfxEvent(Sfx::MenuMove));
                }
                if input.ui_down {
                    session.move_cursor(1, choice_count);
                    sfx.send(PlaySfxEvent(Sfx::MenuMove));
                }
                if input.ui_cancel {
                    Some(DialogueStep::End)
                } else if input.ui_confirm {
                    sfx.send(PlaySfxEvent(Sfx::MenuSelect));
                    Some(session.advance(tree, &inventory))
                } else {
                    None
                }
            }
            None => Some(DialogueStep::End),
        },
        None => Some(DialogueStep::End),
    };

    match step {
        Some(DialogueStep::Continue(actions)) => {
            if let Some(session) = &active.session {
                let npc = session.npc;
                apply_actions(actions, npc, &mut npcs, &mut pickups, &mut removals);
            }
        }
        Some(DialogueStep::End) => {
            active.session = None;
            end_events.send(DialogueEndEvent);
            next_state.set(GameState::Playing);
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Item;

    fn tree() -> DialogueTree {
        DialogueTree::new("mira_intro", "hello")
            .node(
                "hello",
                DialogueNode::line("Mira", "Oh, a traveller!", None).with_choices(vec![
                    DialogueChoice::new("Who are you?", Some("who")),
                    DialogueChoice::new("I found your key.", Some("key")).requiring("rusty_key"),
                    DialogueChoice::new("Bye.", None),
                ]),
            )
            .node("who", DialogueNode::line("Mira", "I keep the well.", Some("gift")))
            .node(
                "gift",
                DialogueNode::line("Mira", "Take this.", Some("dangling")).with_actions(vec![
                    DialogueAction::GiveItem {
                        item_id: "potion".into(),
                        quantity: 1,
                    },
                ]),
            )
            .node(
                "key",
                DialogueNode::line("Mira", "Thank you!", None).with_actions(vec![
                    DialogueAction::TakeItem {
                        item_id: "rusty_key".into(),
                        quantity: 1,
                    },
                    DialogueAction::Walk(vec![Vec2::new(16.0, 0.0)]),
                ]),
            )
    }

    #[test]
    fn test_choices_follow_links_and_return_entry_actions() {
        let tree = tree();
        let inv = Inventory::with_capacity(4);
        let (mut session, actions) = DialogueSession::start(&tree, Entity::PLACEHOLDER).unwrap();
        assert!(actions.is_empty());
        assert_eq!(session.visible_choices(&tree, &inv).len(), 2);

        assert_eq!(session.advance(&tree, &inv), DialogueStep::Continue(vec![]));
        assert_eq!(session.node_id, "who");

        let DialogueStep::Continue(actions) = session.advance(&tree, &inv) else {
            panic!("expected to enter the gift node");
        };
        assert_eq!(
            actions,
            vec![DialogueAction::GiveItem {
                item_id: "potion".into(),
                quantity: 1
            }]
        );

        // "dangling" does not exist.
        assert_eq!(session.advance(&tree, &inv), DialogueStep::End);
    }

    #[test]
    fn test_item_gated_choice_appears_with_item() {
        let tree = tree();
        let inv = Inventory::with_capacity(4);
        inv.add_item(&Item::new("rusty_key", "Rusty Key", false), 1);
        let (mut session, _) = DialogueSession::start(&tree, Entity::PLACEHOLDER).unwrap();

        let texts: Vec<_> = session
            .visible_choices(&tree, &inv)
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(texts, vec!["Who are you?", "I found your key.", "Bye."]);

        session.move_cursor(1, 3);
        let DialogueStep::Continue(actions) = session.advance(&tree, &inv) else {
            panic!("expected to enter the key node");
        };
        assert_eq!(actions.len(), 2);
        assert_eq!(session.node_id, "key");
        assert_eq!(session.advance(&tree, &inv), DialogueStep::End);
    }

    #[test]
    fn test_cursor_wraps() {
        let tree = tree();
        let (mut session, _) = DialogueSession::start(&tree, Entity::PLACEHOLDER).unwrap();
        session.move_cursor(-1, 2);
        assert_eq!(session.cursor, 1);
        session.move_cursor(1, 2);
        assert_eq!(session.cursor, 0);
        session.move_cursor(3, 0);
        assert_eq!(session.cursor, 0);
    }

    #[test]
    fn test_choice_without_next_ends() {
        let tree = tree();
        let inv = Inventory::with_capacity(4);
        let (mut session, _) = DialogueSession::start(&tree, Entity::PLACEHOLDER).unwrap();
        session.move_cursor(1, 2);
        assert_eq!(session.advance(&tree, &inv), DialogueStep::End);
    }

    #[test]
    fn test_missing_start_node() {
        let tree = DialogueTree::new("empty", "nowhere");
        assert!(DialogueSession::start(&tree, Entity::PLACEHOLDER).is_none());
    }
}
