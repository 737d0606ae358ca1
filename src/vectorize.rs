//! Conversion of projected text into fixed-width numeric matrices.

use ndarray::Array2;

use crate::error::{QavecError, Result};
use crate::pairing::Exchange;
use crate::vocab::{CharId, CharIndex, PAD_ID};

/// Encodes one projected string as one identifier per character.
///
/// Characters absent from the index (the out-of-alphabet marker included)
/// encode to [`PAD_ID`], which downstream models treat as maskable; an
/// unknown character is never an error.
#[must_use]
pub fn encode_text(text: &str, index: &CharIndex) -> Vec<CharId> {
    text.chars()
        .map(|c| index.id_of(c).unwrap_or(PAD_ID))
        .collect()
}

/// Left-zero-pads every sequence to the longest length observed across both
/// sides and stacks each side into a row-per-sequence `f32` matrix.
///
/// Both matrices share one column count so encoder and decoder tensors stay
/// shape-compatible. All padding sits on the left; each row's suffix is the
/// unpadded sequence. A row whose sequence begins with a 0-encoded
/// character is indistinguishable from padding at that position.
pub fn pad_and_stack(
    questions: &[Vec<CharId>],
    answers: &[Vec<CharId>],
) -> Result<(Array2<f32>, Array2<f32>)> {
    if questions.len() != answers.len() {
        return Err(QavecError::Internal(format!(
            "question rows ({}) and answer rows ({}) diverged",
            questions.len(),
            answers.len()
        )));
    }
    if questions.is_empty() {
        return Err(QavecError::EmptyDataset("no sequences to vectorize".into()));
    }
    let width = questions
        .iter()
        .chain(answers.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    Ok((stack_rows(questions, width), stack_rows(answers, width)))
}

/// Encodes and stacks both sides of the projected exchanges.
pub fn vectorize_exchanges(
    exchanges: &[Exchange],
    index: &CharIndex,
) -> Result<(Array2<f32>, Array2<f32>)> {
    let questions: Vec<Vec<CharId>> = exchanges
        .iter()
        .map(|exchange| encode_text(&exchange.question, index))
        .collect();
    let answers: Vec<Vec<CharId>> = exchanges
        .iter()
        .map(|exchange| encode_text(&exchange.answer, index))
        .collect();
    pad_and_stack(&questions, &answers)
}

fn stack_rows(sequences: &[Vec<CharId>], width: usize) -> Array2<f32> {
    let mut matrix = Array2::zeros((sequences.len(), width));
    for (row, sequence) in sequences.iter().enumerate() {
        let offset = width - sequence.len();
        for (column, &id) in sequence.iter().enumerate() {
            matrix[[row, offset + column]] = id as f32;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{Alphabet, CharIndex, OOV_TOKEN};

    fn index() -> CharIndex {
        CharIndex::from_alphabet(&Alphabet::generate())
    }

    #[test]
    fn encode_emits_one_id_per_character() {
        let index = index();
        let text = format!("ab 12{OOV_TOKEN}?");
        let ids = encode_text(&text, &index);
        assert_eq!(ids.len(), text.chars().count());
        for &id in &ids {
            assert!(id as usize <= index.len());
        }
    }

    #[test]
    fn encode_maps_unknown_characters_to_pad() {
        let index = index();
        assert_eq!(encode_text("€", &index), vec![PAD_ID]);
        assert_eq!(encode_text(&OOV_TOKEN.to_string(), &index), vec![PAD_ID]);
        assert_ne!(encode_text("a", &index), vec![PAD_ID]);
    }

    #[test]
    fn pad_and_stack_uses_one_width_for_both_sides() {
        let index = index();
        let questions = vec![encode_text("ab", &index), encode_text("a", &index)];
        let answers = vec![encode_text("abcd", &index), encode_text("x", &index)];
        let (q, a) = pad_and_stack(&questions, &answers).expect("stack");
        assert_eq!(q.shape(), &[2, 4]);
        assert_eq!(a.shape(), &[2, 4]);
    }

    #[test]
    fn padding_is_a_leading_zero_prefix() {
        let index = index();
        let questions = vec![encode_text("ab", &index)];
        let answers = vec![encode_text("abcd", &index)];
        let (q, _) = pad_and_stack(&questions, &answers).expect("stack");

        assert_eq!(q[[0, 0]], 0.0);
        assert_eq!(q[[0, 1]], 0.0);
        let suffix: Vec<f32> = vec![q[[0, 2]], q[[0, 3]]];
        let raw: Vec<f32> = questions[0].iter().map(|&id| id as f32).collect();
        assert_eq!(suffix, raw);
    }

    #[test]
    fn empty_batch_is_an_error() {
        let err = pad_and_stack(&[], &[]).expect_err("no sequences");
        assert!(matches!(err, QavecError::EmptyDataset(_)));
    }

    #[test]
    fn mismatched_sides_are_an_internal_error() {
        let index = index();
        let err = pad_and_stack(&[encode_text("a", &index)], &[]).expect_err("diverged");
        assert!(matches!(err, QavecError::Internal(_)));
    }

    #[test]
    fn empty_strings_become_all_padding_rows() {
        let index = index();
        let exchanges = vec![Exchange {
            question: String::new(),
            answer: "ok".into(),
        }];
        let (q, a) = vectorize_exchanges(&exchanges, &index).expect("stack");
        assert_eq!(q.shape(), &[1, 2]);
        assert!(q.iter().all(|&value| value == 0.0));
        assert!(a.iter().any(|&value| value > 0.0));
    }
}
