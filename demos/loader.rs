//! Threaded asset loading with liveness tokens.
//!
//! Pass an STL path: `cargo run --example loader -- model.stl`. Without one
//! the demo still shows the error path and the dead-token drop.

use std::time::Duration;

use vitrine::*;

fn main() -> Result<(), SessionError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "missing.stl".into());

    let mut session = Session::create(SessionConfig::new("loader-demo"));
    session.attach_scene(|_| CameraSpec::Perspective {
        fov_y: 60.0,
        aspect: None,
        near: 0.1,
        far: 200.0,
        position: Vec3::new(0.0, 5.0, 15.0),
        look_at: Vec3::ZERO,
    })?;
    session.attach_surface(&HostContainer::offscreen(800, 600))?;

    let mut loader = AssetLoader::new();
    loader.load_model(&path, session.live_token(), move |scene, result| match result {
        Ok(model) => {
            let node = scene.add_mesh("exhibit", Transform::new(), None);
            scene.attach_collider(node, Collider::box_collider(model.half_extents() * 2.0));
            log::info!(
                "loaded {} vertices, {} triangles",
                model.positions.len(),
                model.indices.len() / 3
            );
        }
        Err(err) => log::warn!("load failed: {err}"),
    });

    // Deliver completions on the driving thread.
    while loader.in_flight() > 0 {
        if let Some(scene) = session.scene_mut() {
            loader.drain(scene);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    log::info!("scene now has {} node(s)", session.scene().unwrap().len());

    // A load completing after dispose is dropped, not delivered.
    let token = session.live_token();
    loader.load_model(&path, token, |_, _| {
        log::error!("this callback must never run");
    });
    session.dispose();

    let mut scratch = SceneGraph::new();
    std::thread::sleep(Duration::from_millis(200));
    let delivered = loader.drain(&mut scratch);
    log::info!("post-dispose completions delivered: {delivered}");
    Ok(())
}
