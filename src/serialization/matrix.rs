//! CSV export of the encoded question and answer tensors.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::{QavecError, Result};
use crate::split::SplitDataset;

/// File names written by [`save_split_dataset`], in write order.
pub const SPLIT_FILE_NAMES: [&str; 6] = [
    "q_train.csv",
    "a_train.csv",
    "q_val.csv",
    "a_val.csv",
    "q_test.csv",
    "a_test.csv",
];

fn write_view(view: ArrayView2<'_, f32>, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    for row in view.rows() {
        let record: Vec<String> = row.iter().map(|value| format!("{value}")).collect();
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .map_err(|err| QavecError::io(err, Some(path.to_path_buf())))
}

/// Writes a question matrix as one CSV row per sequence.
pub fn write_question_matrix<P: AsRef<Path>>(matrix: &Array2<f32>, path: P) -> Result<()> {
    write_view(matrix.view(), path.as_ref())
}

/// Writes an answer tensor as one CSV row per sequence.
///
/// The trailing singleton axis is dropped so the file layout matches the
/// question matrices.
pub fn write_answer_matrix<P: AsRef<Path>>(answers: &Array3<f32>, path: P) -> Result<()> {
    write_view(answers.index_axis(Axis(2), 0), path.as_ref())
}

/// Writes all six partition files into `dir`, creating it if needed.
///
/// Returns the written paths in the order of [`SPLIT_FILE_NAMES`].
pub fn save_split_dataset<P: AsRef<Path>>(dataset: &SplitDataset, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|err| QavecError::io(err, Some(dir.to_path_buf())))?;

    let mut written = Vec::with_capacity(SPLIT_FILE_NAMES.len());
    let questions = [
        &dataset.questions_train,
        &dataset.questions_validation,
        &dataset.questions_test,
    ];
    let answers = [
        &dataset.answers_train,
        &dataset.answers_validation,
        &dataset.answers_test,
    ];
    for (partition, (question, answer)) in questions.iter().zip(answers.iter()).enumerate() {
        let question_path = dir.join(SPLIT_FILE_NAMES[partition * 2]);
        write_question_matrix(question, &question_path)?;
        written.push(question_path);

        let answer_path = dir.join(SPLIT_FILE_NAMES[partition * 2 + 1]);
        write_answer_matrix(answer, &answer_path)?;
        written.push(answer_path);
    }
    Ok(written)
}
