//! Headless lifecycle walkthrough: no window, no GPU.
//!
//! Run with `cargo run --example lifecycle` and read the log output.

use vitrine::*;

fn main() -> Result<(), SessionError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut session = Session::create(
        SessionConfig::new("lifecycle-demo").clear_color([0.1, 0.1, 0.12, 1.0]),
    );
    log::info!("state: {}", session.state());

    session.attach_scene(|scene| {
        let pedestal = scene.add_group("pedestal", Transform::new(), None);
        let cube = scene.add_mesh(
            "cube",
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            Some(pedestal),
        );
        scene.attach_collider(cube, Collider::box_collider(Vec3::ONE));
        CameraSpec::Perspective {
            fov_y: 50.0,
            aspect: None,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(0.0, 3.0, 8.0),
            look_at: Vec3::new(0.0, 1.0, 0.0),
        }
    })?;
    log::info!("state: {}", session.state());

    let host = HostContainer::offscreen(800, 600);
    session.attach_surface(&host)?;
    log::info!("state: {}, aspect {}", session.state(), session.camera().unwrap().aspect());

    session.start(|scene, _camera, frame| {
        if frame.frame_index % 30 == 0 {
            log::info!("frame {} ({} nodes)", frame.frame_index, scene.len());
        }
        Ok(())
    })?;

    for _ in 0..90 {
        session.tick()?;
    }

    session.handle_resize(400, 600);
    log::info!("after resize, aspect {}", session.camera().unwrap().aspect());

    // Picking works headless too.
    let hits = session.pick(Vec2::ZERO);
    log::info!("center pick: {} hit(s)", hits.len());

    session.dispose();
    session.dispose(); // idempotent
    log::info!("state: {}", session.state());

    match session.start(|_, _, _| Ok(())) {
        Err(err) => log::info!("as expected: {err}"),
        Ok(_) => unreachable!(),
    }
    Ok(())
}
