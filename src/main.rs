//! Arena skirmish demo: one player against a ring of agents.

use arena_skirmish::prelude::*;
use avian2d::prelude::*;

/// Agents spawned around the player, one per template.
const RING_RADIUS: f32 = 9.0;

/// Half extent of the square arena.
const ARENA_HALF: f32 = 16.0;

fn main() {
    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Arena Skirmish".to_string(),
                    resolution: (1280, 720).into(),
                    resizable: true,
                    ..default()
                }),
                ..default()
            })
            .set(ImagePlugin::default_nearest()),
    )
    .add_plugins(arena_skirmish::plugin)
    .insert_resource(GameRng::from_entropy())
    .add_systems(Startup, setup_arena);

    #[cfg(feature = "dev")]
    app.add_plugins((
        bevy_inspector_egui::bevy_egui::EguiPlugin::default(),
        bevy_inspector_egui::quick::WorldInspectorPlugin::new(),
        PhysicsDebugPlugin::default(),
    ));

    app.run();
}

fn setup_arena(
    mut commands: Commands,
    catalog: Res<WeaponCatalog>,
    config: Res<CombatConfig>,
    mut rng: ResMut<GameRng>,
) {
    commands.spawn((Name::new("Camera"), Camera2d));

    let player = spawn_player(
        &mut commands,
        &EntityTemplate::player(),
        Vec2::ZERO,
        &catalog,
        &config,
    );
    commands
        .entity(player)
        .insert(Sprite::from_color(Color::srgb(0.3, 0.7, 1.0), Vec2::splat(0.9)));

    let wave = [
        EntityTemplate::grunt(),
        EntityTemplate::grunt(),
        EntityTemplate::sniper(),
        EntityTemplate::kamikaze(),
        EntityTemplate::jumper(),
    ];
    #[allow(clippy::cast_precision_loss)]
    let step = std::f32::consts::TAU / wave.len() as f32;
    for (i, template) in wave.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let position = Vec2::from_angle(step * i as f32) * RING_RADIUS;
        let agent = spawn_agent(
            &mut commands,
            template,
            position,
            &catalog,
            &config,
            &mut rng.0,
        );
        commands
            .entity(agent)
            .insert(Sprite::from_color(Color::srgb(1.0, 0.35, 0.3), Vec2::splat(0.8)));
    }

    let walls = [
        (Vec2::new(0.0, ARENA_HALF), Vec2::new(ARENA_HALF * 2.0, 1.0)),
        (Vec2::new(0.0, -ARENA_HALF), Vec2::new(ARENA_HALF * 2.0, 1.0)),
        (Vec2::new(ARENA_HALF, 0.0), Vec2::new(1.0, ARENA_HALF * 2.0)),
        (Vec2::new(-ARENA_HALF, 0.0), Vec2::new(1.0, ARENA_HALF * 2.0)),
        (Vec2::new(4.0, 3.0), Vec2::new(1.0, 4.0)),
    ];
    for (position, size) in walls {
        commands.spawn((
            Name::new("Wall"),
            RigidBody::Static,
            Collider::rectangle(size.x, size.y),
            CollisionLayers::new(
                CollisionLayer::Obstacle,
                [CollisionLayer::Pushbox, CollisionLayer::Hitbox],
            ),
            Sprite::from_color(Color::srgb(0.35, 0.35, 0.4), size),
            Transform::from_translation(position.extend(0.0)),
        ));
    }
}
