use emotion_annotator::annotate::OpenCvAnnotator;
use emotion_annotator::camera::CameraManager;
use emotion_annotator::emotion::{CascadeFaceDetector, OnnxEmotionClassifier};
use emotion_annotator::ui::HighGuiWindow;
use emotion_annotator::{AppConfig, EmotionPipeline, LoopController, Result};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system (stderr, `RUST_LOG` aware, `info` by default)
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}

fn run(config: AppConfig) -> Result<()> {
    config.validate()?;

    // Load models before opening the camera
    info!("Carregando modelos... a primeira inicialização pode demorar.");
    let detector = CascadeFaceDetector::new(&config.models.cascade, config.detector)?;
    let classifier =
        OnnxEmotionClassifier::new(&config.models.emotion, config.classifier.clone())?;
    let annotator = OpenCvAnnotator::new(config.style);

    let camera = CameraManager::open(config.camera_index)?;
    let (width, height) = camera.resolution();
    info!("Capturing at {}x{}", width, height);
    let window = HighGuiWindow::open(&config.window_title)?;

    let pipeline = EmotionPipeline::new(detector, classifier, annotator)
        .with_slow_call_warning(config.classifier.slow_call_warning);

    let mut controller = LoopController::new(camera, window, pipeline)
        .with_exit_key(config.exit_key)
        .with_key_poll(config.key_poll);

    info!("Iniciando webcam... Pressione '{}' para sair.", config.exit_key);
    controller.run()?;
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let config = AppConfig::from_env();
    if let Err(e) = run(config) {
        error!("Emotion annotator stopped: {}", e);
        return Err(e);
    }

    Ok(())
}
