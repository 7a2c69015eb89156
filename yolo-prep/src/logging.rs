//! Epoch metric logging to TensorBoard event files.

use crate::common::*;
use std::fs::File;
use tfrecord::{EventWriter, EventWriterConfig};

const VALIDATION_PREFIX: &str = "val_";

/// Writes epoch metrics into separate `training` and `validation` event
/// directories so that both series show up as runs of the same chart.
pub struct MetricLogger {
    training_writer: EventWriter<BufWriter<File>>,
    validation_writer: EventWriter<BufWriter<File>>,
}

impl MetricLogger {
    /// Creates event writers under `log_dir`, or under
    /// `log_dir/experiment` if the experiment name is given.
    pub fn new(log_dir: impl AsRef<Path>, experiment: Option<&str>) -> Result<Self> {
        let log_dir = log_dir.as_ref();
        let run_dir = match experiment {
            Some(name) => log_dir.join(name),
            None => log_dir.to_owned(),
        };

        let create_writer = |name: &str| -> Result<_> {
            let dir = run_dir.join(name);
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create log dir '{}'", dir.display()))?;
            let prefix = dir
                .join("events")
                .into_os_string()
                .into_string()
                .map_err(|path| format_err!("non-UTF-8 log path {:?}", path))?;
            let writer = EventWriter::from_prefix(prefix, "", EventWriterConfig::default())?;
            Ok(writer)
        };

        let training_writer = create_writer("training")?;
        let validation_writer = create_writer("validation")?;
        info!("log metrics to '{}'", run_dir.display());

        Ok(Self {
            training_writer,
            validation_writer,
        })
    }

    /// Writes the metrics of an epoch. Names starting with `val_` go to the
    /// validation run with the prefix stripped. The rest go to the training
    /// run.
    pub fn on_epoch_end<'a>(
        &mut self,
        epoch: usize,
        metrics: impl IntoIterator<Item = (&'a str, f32)>,
    ) -> Result<()> {
        let step = epoch as i64;
        let (training, validation) = split_metrics(metrics);

        for (tag, value) in training {
            self.training_writer.write_scalar(tag, step, value)?;
        }
        for (tag, value) in validation {
            self.validation_writer.write_scalar(tag, step, value)?;
        }

        debug!("logged metrics for epoch {}", epoch);
        Ok(())
    }
}

/// Partitions metrics into training and validation series. Validation names
/// lose their `val_` prefix. The input order is kept within each series.
pub fn split_metrics<'a>(
    metrics: impl IntoIterator<Item = (&'a str, f32)>,
) -> (Vec<(&'a str, f32)>, Vec<(&'a str, f32)>) {
    let mut training = vec![];
    let mut validation = vec![];

    metrics.into_iter().for_each(|(name, value)| {
        match name.strip_prefix(VALIDATION_PREFIX) {
            Some(name) => validation.push((name, value)),
            None => training.push((name, value)),
        }
    });

    (training, validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfrecord::{Event, EventIter, RecordReaderConfig};

    #[test]
    fn split_validation_metrics() {
        let metrics = [("loss", 0.5), ("val_loss", 0.75), ("iou", 0.25), ("val_iou", 0.125)];
        let (training, validation) = split_metrics(metrics);
        assert_eq!(training, vec![("loss", 0.5), ("iou", 0.25)]);
        assert_eq!(validation, vec![("loss", 0.75), ("iou", 0.125)]);
    }

    #[test]
    fn split_only_strips_leading_prefix() {
        let (training, validation) = split_metrics([("loss_val_", 1.0), ("val_val_x", 2.0)]);
        assert_eq!(training, vec![("loss_val_", 1.0)]);
        assert_eq!(validation, vec![("val_x", 2.0)]);
    }

    #[test]
    fn logger_creates_run_dirs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut logger = MetricLogger::new(dir.path(), Some("exp1"))?;
        logger.on_epoch_end(0, [("loss", 1.0), ("val_loss", 2.0)])?;
        logger.on_epoch_end(1, [("loss", 0.5)])?;

        let run_dir = dir.path().join("exp1");
        for (name, expected) in [("training", 2), ("validation", 1)] {
            let files: Vec<_> = fs::read_dir(run_dir.join(name))?.try_collect()?;
            assert_eq!(files.len(), 1);

            let events: Vec<Event> =
                EventIter::open(files[0].path(), RecordReaderConfig::default())?.try_collect()?;
            assert_eq!(events.len(), expected);
        }
        Ok(())
    }
}
