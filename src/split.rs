//! Seeded shuffling and three-way partitioning of the paired matrices.

use ndarray::{Array2, Array3, Axis, Slice};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::validate_split_fractions;
use crate::error::{QavecError, Result};

/// The six tensors produced by one pipeline run.
///
/// Answer tensors carry a trailing singleton axis so they line up with a
/// sequence-output model; question tensors stay two-dimensional.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitDataset {
    /// Question rows for training, rows × width.
    pub questions_train: Array2<f32>,
    /// Answer rows for training, rows × width × 1.
    pub answers_train: Array3<f32>,
    /// Question rows for validation.
    pub questions_validation: Array2<f32>,
    /// Answer rows for validation.
    pub answers_validation: Array3<f32>,
    /// Question rows held out for testing.
    pub questions_test: Array2<f32>,
    /// Answer rows held out for testing.
    pub answers_test: Array3<f32>,
}

impl SplitDataset {
    /// Row counts as (train, validation, test).
    #[must_use]
    pub fn partition_sizes(&self) -> (usize, usize, usize) {
        (
            self.questions_train.nrows(),
            self.questions_validation.nrows(),
            self.questions_test.nrows(),
        )
    }

    /// Column count shared by every tensor.
    #[must_use]
    pub fn sequence_width(&self) -> usize {
        self.questions_train.ncols()
    }
}

/// Shuffles the paired matrices row-synchronously with a seeded generator,
/// then cuts train/validation/test partitions by proportion.
///
/// Cutoffs are integer row counts: train ends at
/// `floor(n * (1 - validation - test))`, validation at
/// `floor(n * (1 - test))`, test takes the rest. Equal seeds give equal
/// partitions.
pub fn split_dataset(
    questions: &Array2<f32>,
    answers: &Array2<f32>,
    validation_fraction: f64,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitDataset> {
    let rows = questions.nrows();
    if answers.nrows() != rows {
        return Err(QavecError::Internal(format!(
            "question rows ({rows}) and answer rows ({}) diverged",
            answers.nrows()
        )));
    }
    validate_split_fractions(validation_fraction, test_fraction)?;

    let mut permutation: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let questions = questions.select(Axis(0), &permutation);
    let answers = answers.select(Axis(0), &permutation);

    let train_end = cutoff(rows, 1.0 - validation_fraction - test_fraction);
    let validation_end = cutoff(rows, 1.0 - test_fraction);

    let take = |matrix: &Array2<f32>, start: usize, end: usize| {
        matrix
            .slice_axis(Axis(0), Slice::from(start..end))
            .to_owned()
    };

    Ok(SplitDataset {
        questions_train: take(&questions, 0, train_end),
        answers_train: take(&answers, 0, train_end).insert_axis(Axis(2)),
        questions_validation: take(&questions, train_end, validation_end),
        answers_validation: take(&answers, train_end, validation_end).insert_axis(Axis(2)),
        questions_test: take(&questions, validation_end, rows),
        answers_test: take(&answers, validation_end, rows).insert_axis(Axis(2)),
    })
}

fn cutoff(rows: usize, fraction: f64) -> usize {
    ((rows as f64) * fraction).floor() as usize
}
