//! Third-party plugin isolation.

pub mod avian;

pub use avian::{CollisionLayer, combatant_layers, line_of_sight};

pub fn plugin(app: &mut bevy::prelude::App) {
    app.add_plugins(avian::plugin);
}
