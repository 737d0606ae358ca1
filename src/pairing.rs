//! Reconstruction of question/answer exchanges from the flat message table.

use log::debug;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use whatlang::Lang;

use crate::config::PipelineConfig;
use crate::corpus::Message;
use crate::error::Result;
use crate::metrics::PairingCounts;
use crate::normalize::{collapse_spaces, TextNormalizer};

/// Suffixes marking a reply as the incomplete half of a split answer.
const PART_SUFFIXES: [&str; 2] = ["(1/2)", "(2/2)"];

/// One customer-question / support-answer pair surviving every filter.
///
/// Both sides are lowercased and cleaned; projection rewrites them once
/// more before vectorization discards the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Customer side.
    pub question: String,
    /// Support side.
    pub answer: String,
}

struct PairOutcome {
    verdict: Verdict,
    detector_failures: usize,
}

enum Verdict {
    Kept(Exchange),
    WrongLanguage,
    Incomplete,
}

/// Join and filter chain turning raw messages into exchanges.
///
/// Starters are inbound messages with no reply reference; replies reach
/// them through an id index built once over the table. Surviving pairs are
/// lowercased, language-filtered, completeness-filtered, and cleaned.
pub struct PairReconstructor<'a> {
    cfg: &'a PipelineConfig,
    normalizer: TextNormalizer,
    target_lang: Lang,
}

impl<'a> PairReconstructor<'a> {
    /// Creates a reconstructor for the given run configuration.
    pub fn new(cfg: &'a PipelineConfig) -> Result<Self> {
        let target_lang = cfg.target_lang()?;
        Ok(Self {
            cfg,
            normalizer: TextNormalizer::new(&cfg.target_handle),
            target_lang,
        })
    }

    /// Reconstructs every exchange in the table, with filter counters.
    ///
    /// Output order is deterministic given input order: starters in table
    /// order, replies in table order within a starter. The per-pair filter
    /// chain is a pure function of its inputs and runs data-parallel; the
    /// language classification dominates the cost of a run.
    pub fn reconstruct(&self, messages: &[Message]) -> (Vec<Exchange>, PairingCounts) {
        let mut counts = PairingCounts::default();

        let mut replies: FxHashMap<u64, Vec<usize>> = FxHashMap::default();
        for (row, message) in messages.iter().enumerate() {
            if let Some(parent) = message.reply_to {
                replies.entry(parent).or_default().push(row);
            }
        }
        debug!("reply index covers {} parent ids", replies.len());

        let mut candidates: Vec<(&Message, &Message)> = Vec::new();
        for starter in messages.iter().filter(|m| m.inbound && m.reply_to.is_none()) {
            counts.starters += 1;
            if let Some(rows) = replies.get(&starter.id) {
                for &row in rows {
                    let answer = &messages[row];
                    counts.joined += 1;
                    if answer.author == self.cfg.target_handle {
                        counts.company_matched += 1;
                        candidates.push((starter, answer));
                    }
                }
            }
        }

        let outcomes: Vec<PairOutcome> = candidates
            .par_iter()
            .map(|(question, answer)| self.filter_pair(question, answer))
            .collect();

        let mut exchanges = Vec::new();
        for outcome in outcomes {
            counts.detector_failures += outcome.detector_failures;
            match outcome.verdict {
                Verdict::Kept(exchange) => {
                    counts.language_kept += 1;
                    exchanges.push(exchange);
                }
                Verdict::WrongLanguage => {}
                Verdict::Incomplete => {
                    counts.language_kept += 1;
                    counts.incomplete_dropped += 1;
                }
            }
        }
        counts.exchanges = exchanges.len();
        (exchanges, counts)
    }

    fn filter_pair(&self, question: &Message, answer: &Message) -> PairOutcome {
        let question_text = question.text.to_lowercase();
        let answer_text = answer.text.to_lowercase();

        let mut detector_failures = 0;
        let question_ok = self.is_target_language(&question_text, &mut detector_failures);
        let answer_ok = self.is_target_language(&answer_text, &mut detector_failures);
        if !(question_ok && answer_ok) {
            return PairOutcome {
                verdict: Verdict::WrongLanguage,
                detector_failures,
            };
        }

        if PART_SUFFIXES
            .iter()
            .any(|suffix| answer_text.ends_with(suffix))
        {
            return PairOutcome {
                verdict: Verdict::Incomplete,
                detector_failures,
            };
        }

        let exchange = Exchange {
            question: self.normalizer.clean(&question_text),
            answer: self.normalizer.clean(&answer_text),
        };
        PairOutcome {
            verdict: Verdict::Kept(exchange),
            detector_failures,
        }
    }

    fn is_target_language(&self, text: &str, detector_failures: &mut usize) -> bool {
        match self.classify(text) {
            Some(lang) => lang == self.target_lang,
            None => {
                *detector_failures += 1;
                self.cfg.fail_open_language
            }
        }
    }

    /// Strips the stoplist phrases, then consults the detector.
    fn classify(&self, text: &str) -> Option<Lang> {
        let mut stripped = text.to_string();
        for phrase in &self.cfg.detector_stoplist {
            if stripped.contains(phrase.as_str()) {
                stripped = stripped.replace(phrase.as_str(), "");
            }
        }
        let stripped = collapse_spaces(&stripped);
        whatlang::detect(&stripped).map(|info| info.lang())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    const QUESTION: &str =
        "My package has not arrived and the tracking page shows an error, can you help me please?";
    const ANSWER: &str = "We are sorry to hear that, please send us a direct message with your \
                          order number and we will take a look right away.";

    fn config() -> PipelineConfig {
        PipelineConfig {
            show_progress: false,
            ..PipelineConfig::default()
        }
    }

    fn reconstruct(
        cfg: &PipelineConfig,
        messages: &[Message],
    ) -> (Vec<Exchange>, PairingCounts) {
        PairReconstructor::new(cfg)
            .expect("valid configuration")
            .reconstruct(messages)
    }

    #[test]
    fn pairs_starters_with_company_replies_only() {
        let cfg = config();
        let messages = vec![
            Message::new(1, "customer_1", true, None, QUESTION),
            Message::new(2, "AmazonHelp", false, Some(1), ANSWER),
            Message::new(3, "customer_2", true, None, QUESTION),
            Message::new(4, "ChaseSupport", false, Some(3), ANSWER),
            Message::new(5, "customer_3", true, None, "Never answered, sadly for them."),
        ];
        let (exchanges, counts) = reconstruct(&cfg, &messages);

        assert_eq!(exchanges.len(), 1);
        assert_eq!(counts.starters, 3);
        assert_eq!(counts.joined, 2);
        assert_eq!(counts.company_matched, 1);
        assert_eq!(counts.exchanges, 1);
        assert!(exchanges[0].question.starts_with("my package"));
        assert!(exchanges[0].answer.starts_with("we are sorry"));
    }

    #[test]
    fn outbound_and_replying_messages_are_never_starters() {
        let cfg = config();
        let messages = vec![
            Message::new(1, "AmazonHelp", false, None, QUESTION),
            Message::new(2, "AmazonHelp", false, Some(1), ANSWER),
            Message::new(3, "customer_1", true, Some(99), QUESTION),
        ];
        let (exchanges, counts) = reconstruct(&cfg, &messages);
        assert!(exchanges.is_empty());
        assert_eq!(counts.starters, 0);
    }

    #[test]
    fn one_starter_with_two_replies_yields_two_exchanges() {
        let cfg = config();
        let messages = vec![
            Message::new(1, "customer_1", true, None, QUESTION),
            Message::new(2, "AmazonHelp", false, Some(1), ANSWER),
            Message::new(3, "AmazonHelp", false, Some(1), ANSWER),
        ];
        let (exchanges, counts) = reconstruct(&cfg, &messages);
        assert_eq!(exchanges.len(), 2);
        assert_eq!(counts.joined, 2);
        assert_eq!(counts.company_matched, 2);
    }

    #[test]
    fn incomplete_multi_part_answers_are_dropped() {
        let cfg = config();
        let half_answer = format!("{ANSWER} (1/2)");
        let messages = vec![
            Message::new(1, "customer_1", true, None, QUESTION),
            Message::new(2, "AmazonHelp", false, Some(1), half_answer),
        ];
        let (exchanges, counts) = reconstruct(&cfg, &messages);
        assert!(exchanges.is_empty());
        assert_eq!(counts.language_kept, 1);
        assert_eq!(counts.incomplete_dropped, 1);
    }

    #[test]
    fn non_target_language_pairs_are_dropped() {
        let cfg = config();
        let messages = vec![
            Message::new(
                1,
                "customer_1",
                true,
                None,
                "ご注文の商品がまだ届いていません。配送状況を確認していただけますか。",
            ),
            Message::new(2, "AmazonHelp", false, Some(1), ANSWER),
        ];
        let (exchanges, counts) = reconstruct(&cfg, &messages);
        assert!(exchanges.is_empty());
        assert_eq!(counts.company_matched, 1);
        assert_eq!(counts.language_kept, 0);
    }

    #[test]
    fn detector_failures_follow_the_fail_open_toggle() {
        let emoji_only = "👍👍";
        let messages = vec![
            Message::new(1, "customer_1", true, None, emoji_only),
            Message::new(2, "AmazonHelp", false, Some(1), ANSWER),
        ];

        let open = config();
        let (kept, counts) = reconstruct(&open, &messages);
        assert_eq!(kept.len(), 1);
        assert_eq!(counts.detector_failures, 1);

        let closed = PipelineConfig {
            fail_open_language: false,
            ..config()
        };
        let (dropped, counts) = reconstruct(&closed, &messages);
        assert!(dropped.is_empty());
        assert_eq!(counts.detector_failures, 1);
    }

    #[test]
    fn stoplist_phrases_are_invisible_to_the_detector() {
        // The phrase list only affects classification; the cleaned text
        // still contains the product name.
        let cfg = config();
        let question = "My amazon fire tv stick stopped working after the latest update, \
                        please tell me how I can fix this problem.";
        let messages = vec![
            Message::new(1, "customer_1", true, None, question),
            Message::new(2, "AmazonHelp", false, Some(1), ANSWER),
        ];
        let (exchanges, _) = reconstruct(&cfg, &messages);
        assert_eq!(exchanges.len(), 1);
        assert!(exchanges[0].question.contains("fire tv stick"));
    }

    #[test]
    fn exchange_sides_are_lowercased_and_cleaned() {
        let cfg = config();
        let question = format!("CHECK www.example.com PLEASE, {QUESTION}");
        let messages = vec![
            Message::new(1, "customer_1", true, None, question),
            Message::new(2, "AmazonHelp", false, Some(1), format!("{ANSWER} ^ib")),
        ];
        let (exchanges, _) = reconstruct(&cfg, &messages);
        assert_eq!(exchanges.len(), 1);
        assert!(exchanges[0].question.starts_with("check § please"));
        assert!(exchanges[0].answer.ends_with("right away."));
        assert!(!exchanges[0].answer.contains("^ib"));
    }
}
