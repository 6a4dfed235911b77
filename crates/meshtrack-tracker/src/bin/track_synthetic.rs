use std::path::PathBuf;

use argh::FromArgs;

use meshtrack_image::{Image, ImageSize};
use meshtrack_lie::{angle_axis_rotate_point, DVec3};
use meshtrack_tracker::{
    CameraInfo, DataTermErrorType, ImageLevel, MeshTemplate, MeshTracker, RigidMotion,
    TrackerConfig, TrackingState,
};

#[derive(FromArgs, Debug)]
/// Track a synthetic grid mesh through a rendered frame and print the energy per iteration.
struct Args {
    /// path to a JSON tracker configuration
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// horizontal shift of the frame, in scene units
    #[argh(option, short = 'x', default = "0.03")]
    shift_x: f64,

    /// vertical shift of the frame, in scene units
    #[argh(option, short = 'y', default = "-0.02")]
    shift_y: f64,

    /// rotation of the frame about the optical axis, in radians
    #[argh(option, short = 'r', default = "0.0")]
    rotation_z: f64,

    /// number of grid vertices per side
    #[argh(option, short = 'n', default = "6")]
    grid_size: usize,
}

fn synthetic_frame(camera: &CameraInfo) -> Result<ImageLevel, Box<dyn std::error::Error>> {
    let size = ImageSize {
        width: camera.width,
        height: camera.height,
    };
    let texture = |x: f32, y: f32| 0.5 + 0.3 * (x / 6.0).sin() * (y / 5.0).cos();
    let gray = Image::from_fn(size, |x, y| [texture(x as f32, y as f32)])?;
    let color = Image::from_fn(size, |x, y| {
        let g = texture(x as f32, y as f32);
        [g, 0.8 * g, 1.0 - g]
    })?;

    // fronto-parallel plane at the depth of the grid
    let level = ImageLevel::from_gray(gray)?
        .with_color(&color)?
        .with_depth(Image::from_size_val(size, 2.0)?)?
        .with_depth_normals(&Image::from_fn(size, |_, _| [0.0, 0.0, 1.0])?)?;
    Ok(level)
}

fn grid_template(n: usize) -> MeshTemplate {
    let step = 0.6 / (n.max(2) - 1) as f64;
    let mut template = MeshTemplate::default();
    for r in 0..n {
        for c in 0..n {
            template
                .vertices
                .push([-0.3 + step * c as f64, -0.3 + step * r as f64, 2.0]);
            let i = r * n + c;
            if c + 1 < n {
                template.edges.push((i, i + 1));
            }
            if r + 1 < n {
                template.edges.push((i, i + n));
            }
        }
    }
    template
}

/// Reference appearance: what each template vertex sees once moved by `truth`.
fn attach_appearance(
    template: &mut MeshTemplate,
    camera: &CameraInfo,
    level: &ImageLevel,
    truth: &RigidMotion,
) -> Result<(), Box<dyn std::error::Error>> {
    let colors = level.color().ok_or("frame has no color channels")?;
    let rotation = DVec3::from_array(truth.rotation);
    let translation = DVec3::from_array(truth.translation);

    template.grays.clear();
    template.colors.clear();
    for vertex in &template.vertices {
        let p = angle_axis_rotate_point(rotation, DVec3::from_array(*vertex)) + translation;
        let projection = camera.project(p);
        let (u, v) = (projection.u, projection.v);
        template.grays.push(level.gray().sample(u, v).value);
        template.colors.push([
            colors[0].sample(u, v).value,
            colors[1].sample(u, v).value,
            colors[2].sample(u, v).value,
        ]);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)?,
        None => TrackerConfig::default(),
    };
    log::info!("tracking with {:?} / {:?}", config.error_type, config.ba_type);

    let camera = CameraInfo::pinhole(96, 72, 60.0, 60.0, 48.0, 36.0);
    let truth = RigidMotion {
        rotation: [0.0, 0.0, args.rotation_z],
        translation: [args.shift_x, args.shift_y, 0.0],
    };
    let level = synthetic_frame(&camera)?;

    let mut template = grid_template(args.grid_size);
    attach_appearance(&mut template, &camera, &level, &truth)?;

    let mut tracker = MeshTracker::new(config);
    let mut state = TrackingState::from_template(&template);
    let summary = tracker.track(&camera, &level, &template, &mut state, None)?;

    tracker.energy().print_energy(&mut std::io::stdout().lock())?;

    println!(
        "{:?} after {} iterations, {} residual blocks",
        summary.termination_reason, summary.iterations, summary.num_residual_blocks
    );
    println!(
        "rotation {:?} translation {:?} (expected {:?} / {:?})",
        state.motion.rotation, state.motion.translation, truth.rotation, truth.translation
    );
    if matches!(
        tracker.config().error_type,
        DataTermErrorType::Depth | DataTermErrorType::DepthPlane
    ) {
        println!("depth terms only constrain the distance to the plane");
    }

    Ok(())
}
