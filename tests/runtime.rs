//! End-to-end behavior of the installed feature: per-instance substitution,
//! scoped particle override, coroutine interception and the counter drain.

use std::sync::Arc;

use ilweave::host::fixtures;
use ilweave::prelude::*;

fn installed_host() -> (Host, SkinHooks) {
    let mut host = Host::with_fixtures();
    let mut hooks = SkinHooks::new();
    hooks.install(&mut host).unwrap();
    (host, hooks)
}

fn spawn_skinned(host: &mut Host, attrs: &Attrs) -> EntityId {
    let overrides = Arc::new(SkinOverrides::from_attrs(attrs, &host.world().particles));
    host.world_mut()
        .scene
        .spawn(Entity::collectible(Position::default()).with_overrides(overrides))
}

fn spawn_plain(host: &mut Host) -> EntityId {
    host.world_mut()
        .scene
        .spawn(Entity::collectible(Position::default()))
}

#[test]
fn test_sound_substitution_per_instance_and_variant() {
    let (mut host, _hooks) = installed_host();
    let mut attrs = Attrs::new();
    attrs
        .set("touchSound", "event:/skin/touch")
        .set("altTouchSound", "event:/skin/touch_alt");

    let skinned = spawn_skinned(&mut host, &attrs);
    let skinned_ghost = {
        let overrides = Arc::new(SkinOverrides::from_attrs(&attrs, &host.world().particles));
        host.world_mut().scene.spawn(
            Entity::collectible(Position::default())
                .ghost()
                .with_overrides(overrides),
        )
    };
    let plain = spawn_plain(&mut host);

    host.on_player(skinned).unwrap();
    host.on_player(skinned_ghost).unwrap();
    host.on_player(plain).unwrap();

    let events = host.world().audio.events();
    assert_eq!(events[0].path, "event:/skin/touch");
    assert_eq!(events[1].path, "event:/skin/touch_alt");
    assert_eq!(events[2].path, fixtures::TOUCH_SOUND);
}

#[test]
fn test_sprite_substitution_falls_back_on_empty() {
    let (mut host, _hooks) = installed_host();
    let mut attrs = Attrs::new();
    attrs.set("sprite", "moon_berry");

    // Skin sets the live sprite only; the ghost sprite stays the host default.
    let skinned = spawn_skinned(&mut host, &attrs);
    let skinned_ghost = {
        let overrides = Arc::new(SkinOverrides::from_attrs(&attrs, &host.world().particles));
        host.world_mut().scene.spawn(
            Entity::collectible(Position::default())
                .ghost()
                .with_overrides(overrides),
        )
    };

    // A second skin overrides the ghost sprite as well.
    let mut full_attrs = Attrs::new();
    full_attrs.set("ghostSprite", "moon_berry_ghost");
    let full_ghost = {
        let overrides = Arc::new(SkinOverrides::from_attrs(
            &full_attrs,
            &host.world().particles,
        ));
        host.world_mut().scene.spawn(
            Entity::collectible(Position::default())
                .ghost()
                .with_overrides(overrides),
        )
    };

    host.added(skinned).unwrap();
    host.added(skinned_ghost).unwrap();
    host.added(full_ghost).unwrap();

    let assignments = host.world().sprites.assignments();
    assert_eq!(assignments[0].sprite, "moon_berry");
    assert_eq!(assignments[1].sprite, fixtures::GHOST_SPRITE);
    assert_eq!(assignments[2].sprite, "moon_berry_ghost");
}

#[test]
fn test_sound_overrides_substitute_verbatim_even_when_empty() {
    let (mut host, _hooks) = installed_host();

    // An override record with no sound attributes set: sound paths carry the
    // record's values verbatim, only sprite identifiers fall back on empty.
    let skinned = spawn_skinned(&mut host, &Attrs::new());
    let plain = spawn_plain(&mut host);

    host.on_player(skinned).unwrap();
    host.on_player(plain).unwrap();
    host.added(skinned).unwrap();

    let events = host.world().audio.events();
    assert_eq!(events[0].path, "");
    assert_eq!(events[1].path, fixtures::TOUCH_SOUND);
    assert_eq!(
        host.world().sprites.assignments()[0].sprite,
        fixtures::SPRITE
    );
}

#[test]
fn test_update_overrides_particle_slots_and_restores_them() {
    let (mut host, _hooks) = installed_host();
    let mut attrs = Attrs::new();
    attrs.set("particleColor1", "00ff00").set("particleColor2", "003300");

    let skinned = spawn_skinned(&mut host, &attrs);
    let plain = spawn_plain(&mut host);

    host.update(skinned);
    host.update(plain);

    let defaults = fixtures::default_slots();
    let events = host.world().particles.events();
    assert_eq!(events[0].particle.color, ilweave::host::Color(0x00, 0xFF, 0x00));
    assert_eq!(events[1].particle, *defaults.glow());

    // The shared slots are back to their saved values after each call.
    assert_eq!(host.world().particles.snapshot(), defaults.snapshot());
}

#[test]
fn test_custom_get_sound_through_the_step_body() {
    let (mut host, _hooks) = installed_host();
    let mut attrs = Attrs::new();
    attrs.set("getSound", "event:/skin/get");

    let skinned = spawn_skinned(&mut host, &attrs);
    host.collect(skinned);
    host.step_frame().unwrap();

    // The substitution reached inside the generated step-body through the
    // synthesized back-reference.
    assert_eq!(host.world().audio.events()[0].path, "event:/skin/get");
}

#[test]
fn test_collect_reskins_the_points_popup() {
    let (mut host, _hooks) = installed_host();
    let mut attrs = Attrs::new();
    attrs.set("sprite", "moon_berry");

    let skinned = spawn_skinned(&mut host, &attrs);
    let co = host.collect(skinned);
    host.step_frame().unwrap();
    host.step_frame().unwrap();

    assert_eq!(host.world().scene.coroutine(co).state, CoroutineState::Completed);
    let points = EntityId(1);
    assert_eq!(host.world().scene.entity(points).kind, EntityKind::Points);
    assert_eq!(host.world().scene.entity(points).sprite.id, "moon_berry");
    assert!(host.world().scene.to_add().is_empty());
}

#[test]
fn test_plain_collect_keeps_the_stock_popup() {
    let (mut host, _hooks) = installed_host();
    let plain = spawn_plain(&mut host);

    host.collect(plain);
    host.step_frame().unwrap();
    host.step_frame().unwrap();

    let points = EntityId(1);
    assert_eq!(host.world().scene.entity(points).kind, EntityKind::Points);
    assert_eq!(host.world().scene.entity(points).sprite.id, "points");
    assert_eq!(host.world().audio.events()[0].path, fixtures::GET_SOUND);
}

#[test]
fn test_abort_fires_completion_once_and_stops_stepping() {
    let (mut host, _hooks) = installed_host();
    let mut attrs = Attrs::new();
    attrs.set("sprite", "moon_berry");

    let skinned = spawn_skinned(&mut host, &attrs);
    let co = host.collect(skinned);
    host.step_frame().unwrap();

    host.abort_coroutines();
    assert_eq!(host.world().scene.coroutine(co).state, CoroutineState::Completed);

    // No points popup was ever scheduled, so the reskin callback had nothing to do.
    let events_before = host.world().audio.events().len();
    host.step_frame().unwrap();
    assert_eq!(host.world().audio.events().len(), events_before);
}

#[test]
fn test_pulse_sound_substitution_with_pulse_enabled() {
    let (mut host, _hooks) = installed_host();
    let mut attrs = Attrs::new();
    attrs.set("pulseSound", "event:/skin/pulse");

    let skinned = spawn_skinned(&mut host, &attrs);
    host.world_mut().scene.entity_mut(skinned).sprite.frame = fixtures::PULSE_FRAME;
    host.on_animate(skinned).unwrap();

    assert_eq!(host.world().audio.events()[0].path, "event:/skin/pulse");
    assert_eq!(host.world().scene.pulses(), &[skinned]);
}

#[test]
fn test_disabled_pulse_suppresses_burst_for_that_skin_only() {
    let (mut host, _hooks) = installed_host();
    let mut attrs = Attrs::new();
    attrs.set("pulseEnabled", "false").set("pulseSound", "event:/skin/pulse");

    let skinned = spawn_skinned(&mut host, &attrs);
    let plain = spawn_plain(&mut host);
    host.world_mut().scene.entity_mut(skinned).sprite.frame = fixtures::PULSE_FRAME;
    host.world_mut().scene.entity_mut(plain).sprite.frame = fixtures::PULSE_FRAME;

    host.on_animate(skinned).unwrap();
    host.on_animate(plain).unwrap();

    // The skinned instance keeps the audible half, the plain one pulses fully.
    let events = host.world().audio.events();
    assert_eq!(events[0].path, "event:/skin/pulse");
    assert_eq!(events[1].path, fixtures::PULSE_SOUND);
    assert_eq!(host.world().scene.pulses(), &[plain]);
}

#[test]
fn test_map_load_drains_the_detection_counter_once() {
    let (mut host, _hooks) = installed_host();
    host.world().level.detected.record(3);

    host.load_map(&MapDef {
        name: "city".to_string(),
        declared_total: 20,
    });
    assert_eq!(host.world().level.map.total_collectibles, 23);

    // A second load without new detections adopts the declared total as-is.
    host.load_map(&MapDef {
        name: "city".to_string(),
        declared_total: 20,
    });
    assert_eq!(host.world().level.map.total_collectibles, 20);
}

#[test]
fn test_uninstalled_host_ignores_detections() {
    let mut host = Host::with_fixtures();
    host.world().level.detected.record(5);
    host.load_map(&MapDef {
        name: "city".to_string(),
        declared_total: 20,
    });
    assert_eq!(host.world().level.map.total_collectibles, 20);
}
