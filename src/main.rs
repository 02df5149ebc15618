//! transknn infers labels for a known set of unlabeled instances by
//! propagating label information through a nearest-neighbor graph built
//! jointly over the labeled training data and the unlabeled test data.
//!
//! It takes CSV input where the first column holds the class label and
//! the remaining columns the feature vector:
//!
//!     0, 0.1, 2.43, 1.1
//!     1, 0.0, 1.22, 1.1
//!     ?, 1.0, 1.02, 0.1
//!     ...
//!
//! A `?` marks a missing class or feature value. Labels present in the
//! test file are never used for learning; they only score the result.
//!
//! The general syntax is:
//!
//!     transknn [options] <train> <test>
//!
//! When no test file is given, the training file is split internally
//! into a train/test pair according to `--folds`.
mod utils;

use std::process;

use docopt::Docopt;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use transknn::collective::{
    CollectiveConfig, CollectiveModel, KnnCollective, TransductiveModel,
};
use transknn::dataset::DistanceKind;
use transknn::evaluation;
use transknn::Label;
use utils::{build_dataset, estimate_random_guessing, load_data, remap_labels, scale01};

const USAGE: &str = "
Transductive classification via collective k-NN label propagation.

Usage: transknn [options] <train> <test>
       transknn [options] <train>
       transknn (--help | --version)

Options:
    --k=<k>             Fixed neighborhood size; skips the internal
                        cross-validated selection.
    --k-cap=<k>         Largest k tried by the internal cross-validated
                        selection [default: 10].
    --cv-folds=<f>      Folds for the internal k selection [default: 5].
    --folds=<f>         Fold count for the internal train/test split
                        used when no test file is given; 0 means no
                        split [default: 10].
    --invert-folds      Make fold 1 the test part of the internal split
                        instead of the training part.
    --restarts=<r>      Independent restarts of the convergence loop
                        [default: 0].
    --iterations=<i>    Round cap per restart; 0 means unbounded
                        [default: 0].
    --indexed-search    Use the norm-pruned neighbor index instead of
                        the exhaustive linear scan.
    --mixed-distance    Use the heterogeneous distance (handles missing
                        values) instead of the Euclidean distance.
    --insight           Retain the true test labels for diagnostics.
    --no-scale          Don't scale features to [0,1] (only makes sense
                        for objects of 2 or more dimensions).
    --seed=<s>          Seed for restart exploration [default: 1].
    -h, --help          Show help.
    --version           Show the version.
";

#[derive(Deserialize)]
struct Args {
    arg_train: String,
    arg_test: Option<String>,
    flag_k: Option<usize>,
    flag_k_cap: usize,
    flag_cv_folds: usize,
    flag_folds: usize,
    flag_invert_folds: bool,
    flag_restarts: usize,
    flag_iterations: usize,
    flag_indexed_search: bool,
    flag_mixed_distance: bool,
    flag_insight: bool,
    flag_no_scale: bool,
    flag_seed: u64,
}

fn config_from_args(args: &Args) -> CollectiveConfig {
    let mut config = CollectiveConfig::default();
    config.folds = args.flag_folds;
    config.invert_folds = args.flag_invert_folds;
    config.use_insight = args.flag_insight;
    config.k = args.flag_k;
    config.k_cap = args.flag_k_cap;
    config.cv_folds = args.flag_cv_folds;
    config.exhaustive_search = !args.flag_indexed_search;
    config.num_restarts = args.flag_restarts;
    config.num_iterations = args.flag_iterations;
    config.distance = if args.flag_mixed_distance {
        DistanceKind::Mixed
    } else {
        DistanceKind::Euclidean
    };
    config.seed = args.flag_seed;
    config
}

fn print_report(
    model: &TransductiveModel,
    test_y: Option<&[Option<Label>]>,
    label_names: &[Label],
) {
    println!("{}", model.summary());
    println!();

    println!("test predictions:");
    for (i, y) in model.test_predictions().iter().enumerate() {
        println!("{}, {}", i, label_names.get(*y).copied().unwrap_or(*y));
    }
    println!();

    if let Some(test_y) = test_y {
        if test_y.iter().any(|y| y.is_some()) {
            println!(
                "Random guessing error: {}",
                estimate_random_guessing(test_y)
            );
            match evaluation::score(model, model.test().features(), test_y) {
                Ok(metrics) => {
                    println!("Accuracy: {}", metrics.accuracy());
                    println!(
                        "Errors: {} of {}",
                        metrics.error_count, metrics.total
                    );
                }
                Err(e) => eprintln!("[!] could not score against test labels: {}", e),
            }
        }
    }

    if let Some(metrics) = evaluation::insight_score(model) {
        println!("Transductive accuracy (insight): {}", metrics.accuracy());
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let (mut train_x, train_y_raw) =
        load_data(&args.arg_train).unwrap_or_else(|e| {
            eprintln!("[!] failed to load training data: {}", e);
            process::exit(1);
        });

    // Remap labels so they are zero-based increasing numbers.
    let (train_y, mapping) = remap_labels(&train_y_raw, None);
    let train_nlabels = mapping.len();

    let test = args.arg_test.as_ref().map(|fname| {
        let (x, y_raw) = load_data(fname).unwrap_or_else(|e| {
            eprintln!("[!] failed to load test data: {}", e);
            process::exit(1);
        });
        (x, y_raw)
    });

    // Remap test labels according to the mapping used for training
    // labels. Every test label should appear in the training data; the
    // converse is not necessary.
    let (test_x, test_y, mapping) = match test {
        Some((mut x, y_raw)) => {
            let (y, mapping) = remap_labels(&y_raw, Some(mapping));
            if mapping.len() != train_nlabels {
                eprintln!("[!] test data contains labels unseen in training data");
                process::exit(1);
            }
            if x.ncols() > 1 && !args.flag_no_scale {
                println!("scaling features");
                scale01(&mut x);
            }
            (Some(x), Some(y), mapping)
        }
        None => (None, None, mapping),
    };

    if train_x.ncols() > 1 && !args.flag_no_scale {
        scale01(&mut train_x);
    }

    // Original label values in id order, for reporting.
    let mut label_names: Vec<Label> = vec![0; mapping.len()];
    for (name, id) in &mapping {
        label_names[*id] = *name;
    }

    let nlabels = mapping.len();
    let train = build_dataset(train_x, train_y, nlabels).unwrap_or_else(|e| {
        eprintln!("[!] bad training data: {}", e);
        process::exit(1);
    });

    let mut classifier = KnnCollective::new(config_from_args(&args));
    let result = match (&test_x, &test_y) {
        (Some(x), Some(y)) => {
            let test = build_dataset(x.clone(), y.clone(), nlabels).unwrap_or_else(|e| {
                eprintln!("[!] bad test data: {}", e);
                process::exit(1);
            });
            classifier.build(&train, &test)
        }
        _ => classifier.build_internal(&train),
    };

    if let Err(e) = result {
        eprintln!("[!] build failed: {}", e);
        process::exit(1);
    }

    match classifier.model() {
        Some(model) => print_report(model, test_y.as_deref(), &label_names),
        None => {
            eprintln!("[!] build did not produce a model");
            process::exit(1);
        }
    }
}
