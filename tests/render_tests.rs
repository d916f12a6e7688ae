use dodeca::{
    config::{BACKGROUND_COLOR, GEOM_TOLERANCE},
    frame::{PixelBuffer, Renderer},
    geom::Solid,
    hull::PlaneSet,
    orientation::Tumble,
    settings,
    trace::{self, Scene},
};
use nalgebra::Vector3;

// Fraction of the default 800x600 frame covered by the solid. At a screen
// scale of 300 the silhouette is between the projected inradius (~206 px)
// and circumradius (~260 px).
const MIN_COVERAGE: f64 = 0.25;
const MAX_COVERAGE: f64 = 0.5;

#[test]
fn dodecahedron_end_to_end() {
    let settings = settings::load_default_config().unwrap();
    let points = Solid::Dodecahedron.scaled_vertices(0.5);
    assert_eq!(settings.points(), points);

    let planes = PlaneSet::extract(&points, settings.max_planes);
    assert_eq!(planes.len(), 12);
    for plane in &planes {
        assert!((plane.normal.norm() - 1.0).abs() < GEOM_TOLERANCE);
        assert!(points.iter().all(|p| plane.normal.dot(p) <= plane.offset + GEOM_TOLERANCE));
    }

    let scene = settings.scene();
    let eye = Vector3::new(0.0, 0.0, -5.0);
    let hit = trace::trace_ray(&eye, &Vector3::z(), planes.as_slice()).unwrap();
    assert!(hit.t_near <= hit.t_far && hit.t_far >= 0.0);
    let color = trace::shade_ray(&eye, &Vector3::z(), planes.as_slice(), &scene);
    assert_ne!(color, BACKGROUND_COLOR);
}

#[test]
fn full_frame_coverage() {
    let settings = settings::load_default_config().unwrap();
    let renderer = Renderer::new(&settings);
    let mut buffer = PixelBuffer::new(settings.width, settings.height);

    for elapsed in [0.0, 1.0, 7.5, 123.4] {
        renderer.draw(elapsed, &mut buffer);
        let covered = buffer
            .pixels()
            .iter()
            .filter(|&&p| p != settings.background)
            .count();
        let fraction = covered as f64 / buffer.pixels().len() as f64;
        assert!(
            fraction > MIN_COVERAGE && fraction < MAX_COVERAGE,
            "elapsed: {}, coverage: {}",
            elapsed,
            fraction
        );

        // every shaded pixel is grey
        for &p in buffer.pixels().iter().filter(|&&p| p != settings.background) {
            let (r, g, b) = ((p >> 16) & 0xFF, (p >> 8) & 0xFF, p & 0xFF);
            assert!(r == g && g == b, "pixel: {:#08x}", p);
        }

        // the centre ray always passes through the solid
        let centre = buffer.get(settings.width / 2, settings.height / 2).unwrap();
        assert_ne!(centre, settings.background);
    }
}

#[test]
fn every_solid_renders() {
    let mut settings = settings::load_default_config().unwrap();
    settings.width = 80;
    settings.height = 60;
    settings.screen_scale = 30.0;

    for solid in [
        Solid::Dodecahedron,
        Solid::Cube,
        Solid::Octahedron,
        Solid::Icosahedron,
    ] {
        settings.solid = solid;
        let renderer = Renderer::new(&settings);
        assert_eq!(renderer.base_planes().len(), solid.expected_faces());

        let mut buffer = PixelBuffer::new(settings.width, settings.height);
        renderer.draw(0.3, &mut buffer);
        assert_ne!(buffer.get(40, 30).unwrap(), settings.background, "solid: {}", solid);
        assert_eq!(buffer.get(0, 0).unwrap(), settings.background, "solid: {}", solid);
    }
}

#[test]
fn tumbled_solid_stays_convex() {
    let planes = PlaneSet::extract(&Solid::Dodecahedron.scaled_vertices(0.5), 30);
    let tumble = Tumble::new(0.9);
    let rotated = planes.rotated(&tumble);
    // the tumbled vertices lie inside the tumbled half-spaces
    for p in Solid::Dodecahedron.scaled_vertices(0.5) {
        assert!(rotated.contains(&tumble.rotate(&p), 1e-9));
    }
}

#[test]
fn custom_scene_background() {
    let planes = PlaneSet::extract(&Solid::Cube.scaled_vertices(0.5), 30);
    let mut scene = Scene::default();
    scene.background = 0x0000FF;
    let color = trace::shade_ray(
        &Vector3::new(0.0, 0.0, -5.0),
        &Vector3::new(1.0, 1.0, 0.2).normalize(),
        planes.as_slice(),
        &scene,
    );
    assert_eq!(color, 0x0000FF);
}
