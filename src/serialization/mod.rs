//! Persistence of run artifacts: the character index and the split tensors.

pub mod char_index;
pub mod matrix;

pub use char_index::{char_index_json, load_char_index, save_char_index};
pub use matrix::{save_split_dataset, write_answer_matrix, write_question_matrix, SPLIT_FILE_NAMES};
