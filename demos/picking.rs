//! Windowed click-picking: a row of exhibits, click one to identify it.

use vitrine::*;

fn main() -> Result<(), SessionError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run_with_pick(
        AppConfig::new("picking demo").size(1024, 768),
        |scene| {
            for (i, name) in ["vase", "statue", "relief"].iter().enumerate() {
                let x = (i as f32 - 1.0) * 3.0;
                let node = scene.add_mesh(
                    *name,
                    Transform::from_position(Vec3::new(x, 0.0, 0.0)),
                    None,
                );
                scene.attach_collider(node, Collider::sphere(1.0));
            }
            CameraSpec::Perspective {
                fov_y: 45.0,
                aspect: None,
                near: 0.1,
                far: 100.0,
                position: Vec3::new(0.0, 2.0, 12.0),
                look_at: Vec3::ZERO,
            }
        },
        |_scene, _camera, _frame| Ok(()),
        |hits, scene| match hits.first() {
            Some(hit) => {
                let name = scene
                    .node(hit.node)
                    .map(|n| n.name)
                    .unwrap_or_else(|| "?".into());
                log::info!("picked '{}' at distance {:.2}", name, hit.distance);
            }
            None => log::info!("clicked empty space"),
        },
    )
}
