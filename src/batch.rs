//! Converting many files at once
use crate::config::ConvertConfig;
use crate::error::{ConversionError, Error, Stage};
use crate::pipeline::{self, Artifacts};
use log::{debug, error, info};
use std::any::Any;
use std::fs::read_dir;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

/// The outcome of converting one file
pub type Outcome = (PathBuf, Result<Artifacts, ConversionError>);

/// Collect the input files named by `path`
///
/// A file is returned as is. A directory yields every regular file it
/// contains, sorted by name.
///
/// # Errors
///
/// Returns [`Error::InputFormat`] if the path does not exist or the
/// directory cannot be listed.
pub fn input_files(path: &Path) -> Result<Vec<PathBuf>, Error> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let dir = read_dir(path).map_err(|e| Error::InputFormat(format!("{}: {}", path.display(), e)))?;
    let mut files = Vec::new();
    for entry in dir {
        let entry = entry.map_err(|e| Error::InputFormat(format!("{}: {}", path.display(), e)))?;
        let p = entry.path();
        if p.is_file() {
            files.push(p);
        }
    }
    files.sort();
    Ok(files)
}

/// The number of worker threads used for `jobs` files
///
/// This is the available parallelism of the machine, but never more
/// than the number of files.
pub fn worker_count(jobs: usize) -> usize {
    let available = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    available.min(jobs).max(1)
}

/// Convert every file on a bounded pool of worker threads
///
/// A failed or panicking file is logged and does not affect the others.
/// There is one outcome per input, in the order of `inputs`.
pub fn convert_all(inputs: &[PathBuf], output_dir: &Path, config: &ConvertConfig) -> Vec<Outcome> {
    run_all(
        inputs,
        output_dir,
        config,
        worker_count(inputs.len()),
        pipeline::convert_file,
    )
}

/// Render every file to a plain TIFF on a bounded pool of worker threads
pub fn render_all(
    inputs: &[PathBuf],
    output_dir: &Path,
    config: &ConvertConfig,
) -> Vec<(PathBuf, Result<PathBuf, ConversionError>)> {
    run_all(
        inputs,
        output_dir,
        config,
        worker_count(inputs.len()),
        pipeline::render_file,
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn worker_failure(input: &Path, message: String) -> ConversionError {
    ConversionError {
        path: input.to_path_buf(),
        stage: Stage::Worker,
        source: Error::Panicked(message),
    }
}

fn run_all<T, F>(
    inputs: &[PathBuf],
    output_dir: &Path,
    config: &ConvertConfig,
    workers: usize,
    job: F,
) -> Vec<(PathBuf, Result<T, ConversionError>)>
where
    T: Send,
    F: Fn(&Path, &Path, &ConvertConfig) -> Result<T, ConversionError> + Sync,
{
    debug!("Processing {} files on {} workers", inputs.len(), workers);

    // Open a channel for collecting the outcomes of the workers
    let (tx, rx) = mpsc::channel();
    let next = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..workers {
            let tx1 = tx.clone();
            let next = &next;
            let job = &job;
            s.spawn(move || loop {
                let i = next.fetch_add(1, Ordering::SeqCst);
                let input = match inputs.get(i) {
                    Some(input) => input,
                    None => break,
                };
                let res = panic::catch_unwind(AssertUnwindSafe(|| job(input, output_dir, config)))
                    .unwrap_or_else(|payload| Err(worker_failure(input, panic_message(&*payload))));
                if tx1.send((i, res)).is_err() {
                    break;
                }
            });
        }

        // Explicitly drop the Sender to close the channel
        drop(tx);
    });

    let mut results: Vec<Option<Result<T, ConversionError>>> = inputs.iter().map(|_| None).collect();
    for (i, res) in rx.iter() {
        results[i] = Some(res);
    }

    inputs
        .iter()
        .zip(results)
        .map(|(input, res)| {
            let res = res.unwrap_or_else(|| {
                Err(worker_failure(input, "no outcome was reported".to_string()))
            });
            match &res {
                Ok(_) => info!("Finished {}", input.display()),
                Err(e) => error!("{}", e),
            }
            (input.clone(), res)
        })
        .collect()
}
