use bevy::prelude::*;

use crate::dialogue::{
    DialogueAction, DialogueChoice, DialogueNode, DialogueRegistry, DialogueTree,
};
use crate::interact::{NpcDef, NpcRegistry};

/// Villagers and what they say.
///
///   1. Mira: keeps the village well, lends out her pickaxe
///   2. Bram: old smith, trades a tumble charm for iron ore
pub fn populate_npcs(npcs: &mut NpcRegistry, dialogue: &mut DialogueRegistry) {
    // ── 1. Mira ─────────────────────────────────────────────────────────────
    npcs.npcs.insert(
        "mira".into(),
        NpcDef {
            id: "mira".into(),
            name: "Mira".into(),
            dialogue: "mira_intro".into(),
            color: Color::srgb(0.4, 0.55, 0.85),
            speed: 40.0,
        },
    );
    dialogue.register(
        DialogueTree::new("mira_intro", "hello")
            .node(
                "hello",
                DialogueNode::line("Mira", "Oh! A traveller. The road's been quiet since the bandits moved in.", None)
                    .with_choices(vec![
                        DialogueChoice::new("Can I help?", Some("help")),
                        DialogueChoice::new("I found this key.", Some("key")).requiring("rusty_key"),
                        DialogueChoice::new("Just passing through.", Some("bye")),
                    ]),
            )
            .node(
                "help",
                DialogueNode::line("Mira", "Rocks have blocked the east path. Take my pickaxe.", Some("help_2"))
                    .with_actions(vec![DialogueAction::GiveItem {
                        item_id: "pickaxe".into(),
                        quantity: 1,
                    }]),
            )
            .node(
                "help_2",
                DialogueNode::line("Mira", "Bram at the forge might have something for the ore you dig up.", None),
            )
            .node(
                "key",
                DialogueNode::line("Mira", "That's the old shed key! Come, I'll show you.", None)
                    .with_actions(vec![DialogueAction::Walk(vec![
                        Vec2::new(0.0, 24.0),
                        Vec2::new(32.0, 0.0),
                    ])]),
            )
            .node("bye", DialogueNode::line("Mira", "Mind the slimes by the pond.", None)),
    );

    // ── 2. Bram ─────────────────────────────────────────────────────────────
    npcs.npcs.insert(
        "bram".into(),
        NpcDef {
            id: "bram".into(),
            name: "Bram".into(),
            dialogue: "bram_forge".into(),
            color: Color::srgb(0.6, 0.45, 0.3),
            speed: 30.0,
        },
    );
    dialogue.register(
        DialogueTree::new("bram_forge", "hello")
            .node(
                "hello",
                DialogueNode::line("Bram", "Hmph. Bring me iron and I'll make it worth your while.", None)
                    .with_choices(vec![
                        DialogueChoice::new("Here's some ore.", Some("trade")).requiring("iron_ore"),
                        DialogueChoice::new("Later.", None),
                    ]),
            )
            .node(
                "trade",
                DialogueNode::line("Bram", "Good ore. Wear this charm and you'll roll like a barrel.", Some("tip"))
                    .with_actions(vec![
                        DialogueAction::TakeItem {
                            item_id: "iron_ore".into(),
                            quantity: 1,
                        },
                        DialogueAction::GiveItem {
                            item_id: "tumble_charm".into(),
                            quantity: 1,
                        },
                    ]),
            )
            .node(
                "tip",
                DialogueNode::line("Bram", "Watch a foe's swing. Strike back just before it lands.", None),
            ),
    );

    // Fallback for NPCs without a tree of their own.
    dialogue.register(DialogueTree::new("default", "hello").node(
        "hello",
        DialogueNode::line("???", "...", None),
    ));
}
