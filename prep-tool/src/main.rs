use anyhow::{ensure, Context as _, Result};
use clap::Parser;
use log::{info, warn};
use ndarray::{arr1, Axis, Ix3, Ix4};
use prettytable::{cell, row, Table};
use rand::{rngs::StdRng, SeedableRng};
use std::{
    fs,
    path::{Path, PathBuf},
};
use yolo_prep::{
    config::Config,
    dataset,
    grid::{GridDecoder, GridEncoder},
    iou::intersection_over_union,
    record::{ExampleSink, RawTensorCodec, TensorCodec},
    storage::{checkpoint_uri, LocalObjectStore},
};

#[derive(Debug, Clone, Parser)]
enum Opts {
    /// Encode images and YOLO label files into a TFRecord file.
    Encode {
        /// configuration file
        #[clap(long)]
        config: PathBuf,
        /// output record file
        #[clap(long)]
        output: PathBuf,
        /// directory of label files, defaults to the directory of each image
        #[clap(long)]
        label_dir: Option<PathBuf>,
        /// apply the configured random augmentation
        #[clap(long)]
        augment: bool,
        /// random seed for augmentation
        #[clap(long)]
        seed: Option<u64>,
        /// input images
        images: Vec<PathBuf>,
    },
    /// Decode a serialized prediction tensor into boxes.
    Decode {
        /// configuration file
        #[clap(long)]
        config: PathBuf,
        /// serialized tensor of shape [N, S, S, C+5B] or [S, S, C+5B]
        #[clap(long)]
        input: PathBuf,
        /// overrides the configured confidence threshold
        #[clap(long)]
        threshold: Option<f32>,
    },
    /// Find the checkpoint to resume from in a local object store.
    Checkpoint {
        /// directory containing one subdirectory per bucket
        #[clap(long)]
        root: PathBuf,
        #[clap(long)]
        bucket: String,
        #[clap(long)]
        path: String,
        #[clap(long)]
        epoch: Option<usize>,
    },
    /// Compute the IoU of two boxes.
    Iou {
        /// center x, center y, width and height of both boxes
        #[clap(allow_hyphen_values = true)]
        values: Vec<f32>,
    },
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::Encode {
            config,
            output,
            label_dir,
            augment,
            seed,
            images,
        } => {
            encode(config, output, label_dir, augment, seed, &images)?;
        }
        Opts::Decode {
            config,
            input,
            threshold,
        } => {
            decode(config, input, threshold)?;
        }
        Opts::Checkpoint {
            root,
            bucket,
            path,
            epoch,
        } => {
            let store = LocalObjectStore::new(root);
            match checkpoint_uri(&store, &bucket, &path, epoch)? {
                Some(uri) => println!("{}", uri),
                None => println!("no checkpoint"),
            }
        }
        Opts::Iou { values } => {
            ensure!(values.len() == 8, "expect 8 values, but get {}", values.len());
            let iou = intersection_over_union(
                &arr1(&values[0..4]).into_dyn().view(),
                &arr1(&values[4..8]).into_dyn().view(),
            )?;
            iou.iter().for_each(|value| println!("{}", value));
        }
    }

    Ok(())
}

fn encode(
    config_file: impl AsRef<Path>,
    output_file: impl AsRef<Path>,
    label_dir: Option<PathBuf>,
    augment: bool,
    seed: Option<u64>,
    image_files: &[PathBuf],
) -> Result<()> {
    ensure!(!image_files.is_empty(), "no input images");

    let config = Config::open(config_file)?;
    let encoder = GridEncoder::new(config.grid);
    let augmentation = if augment {
        Some(config.augmentation.clone().build()?)
    } else {
        None
    };
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut sink = ExampleSink::create(output_file)?;

    for image_file in image_files {
        let label_file = label_file_of(image_file, label_dir.as_deref())?;
        let (image, labels) = dataset::load_sample(image_file, &label_file)?;
        if labels.is_empty() {
            warn!("'{}' has no boxes", label_file.display());
        }

        let (image, labels) = match &augmentation {
            Some(augmentation) => augmentation.forward(&image, &labels, &mut rng)?,
            None => (image, labels),
        };
        let example = encoder.encode_example(&image, &labels)?;
        sink.send(&example)?;
    }

    sink.finish()?;
    Ok(())
}

fn decode(
    config_file: impl AsRef<Path>,
    input_file: impl AsRef<Path>,
    threshold: Option<f32>,
) -> Result<()> {
    let config = Config::open(config_file)?;
    let input_file = input_file.as_ref();
    let bytes = fs::read(input_file)
        .with_context(|| format!("failed to read '{}'", input_file.display()))?;
    let tensor = RawTensorCodec.decode_f32(&bytes)?;

    let prediction = match tensor.ndim() {
        3 => tensor.into_dimensionality::<Ix3>()?.insert_axis(Axis(0)),
        _ => tensor.into_dimensionality::<Ix4>()?,
    };
    let threshold = threshold.unwrap_or(config.decode.confidence_threshold.raw() as f32);

    let detections = GridDecoder::new(config.grid).decode(&prediction.view(), threshold)?;
    info!("decoded {} boxes", detections.len());

    let mut table = Table::new();
    table.add_row(row!["sample", "class", "confidence", "x", "y", "w", "h"]);
    detections.iter().for_each(|det| {
        table.add_row(row![
            det.sample,
            det.class,
            format!("{:.4}", det.confidence),
            format!("{:.4}", det.x),
            format!("{:.4}", det.y),
            format!("{:.4}", det.w),
            format!("{:.4}", det.h),
        ]);
    });
    table.printstd();

    Ok(())
}

fn label_file_of(image_file: &Path, label_dir: Option<&Path>) -> Result<PathBuf> {
    let stem = image_file
        .file_stem()
        .with_context(|| format!("invalid image path '{}'", image_file.display()))?;
    let dir = match label_dir {
        Some(dir) => dir,
        None => image_file.parent().unwrap_or_else(|| Path::new("")),
    };
    Ok(dir.join(format!("{}.txt", stem.to_string_lossy())))
}
