pub mod config_ops;
pub mod model_ops;

use std::path::Path;

use clap::ValueEnum;

use lm_core::model::{
    read_order, CachedDynamicModel, DynamicModel, DynamicModelKN, UnigramModel,
};
use lm_core::vocab::CONTROL_WORDS;
use lm_core::{DynamicLanguageModel, LanguageModel, LmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    Unigram,
    Dynamic,
    KneserNey,
    Cached,
}

/// Any of the trainable model kinds.
pub enum AnyModel {
    Unigram(UnigramModel),
    Dynamic(DynamicModel),
    KneserNey(DynamicModelKN),
    Cached(CachedDynamicModel),
}

impl AnyModel {
    pub fn new(kind: ModelKind, order: usize) -> Self {
        match kind {
            ModelKind::Unigram => AnyModel::Unigram(UnigramModel::new()),
            ModelKind::Dynamic => AnyModel::Dynamic(DynamicModel::new(order)),
            ModelKind::KneserNey => AnyModel::KneserNey(DynamicModelKN::new(order)),
            ModelKind::Cached => AnyModel::Cached(CachedDynamicModel::new(order)),
        }
    }

    /// Load a saved model. Without an explicit kind, order-1 files open as
    /// unigram models and everything else as plain dynamic models.
    pub fn open(path: &Path, kind: Option<ModelKind>) -> Result<Self, LmError> {
        let kind = match kind {
            Some(kind) => kind,
            None if read_order(path)? <= 1 => ModelKind::Unigram,
            None => ModelKind::Dynamic,
        };
        let mut model = Self::new(kind, 2);
        model.as_dynamic_mut().load(path)?;
        Ok(model)
    }

    pub fn as_dynamic(&self) -> &dyn DynamicLanguageModel {
        match self {
            AnyModel::Unigram(m) => m,
            AnyModel::Dynamic(m) => m,
            AnyModel::KneserNey(m) => m,
            AnyModel::Cached(m) => m,
        }
    }

    pub fn as_dynamic_mut(&mut self) -> &mut dyn DynamicLanguageModel {
        match self {
            AnyModel::Unigram(m) => m,
            AnyModel::Dynamic(m) => m,
            AnyModel::KneserNey(m) => m,
            AnyModel::Cached(m) => m,
        }
    }

    pub fn as_language_model(&self) -> &dyn LanguageModel {
        match self {
            AnyModel::Unigram(m) => m,
            AnyModel::Dynamic(m) => m,
            AnyModel::KneserNey(m) => m,
            AnyModel::Cached(m) => m,
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            AnyModel::Unigram(_) => ModelKind::Unigram,
            AnyModel::Dynamic(_) => ModelKind::Dynamic,
            AnyModel::KneserNey(_) => ModelKind::KneserNey,
            AnyModel::Cached(_) => ModelKind::Cached,
        }
    }
}

/// Whitespace tokens of one corpus line, starting with a sentence mark.
pub fn line_tokens(line: &str) -> Vec<&str> {
    let mut tokens = vec![CONTROL_WORDS[1]];
    tokens.extend(line.split_whitespace());
    tokens
}

/// `path[:weight]`
pub fn parse_model_arg(arg: &str) -> (&str, Option<f64>) {
    match arg.rsplit_once(':') {
        Some((path, weight)) if !path.is_empty() => match weight.parse() {
            Ok(w) => (path, Some(w)),
            Err(_) => (arg, None),
        },
        _ => (arg, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_arg() {
        assert_eq!(parse_model_arg("a.lm"), ("a.lm", None));
        assert_eq!(parse_model_arg("a.lm:0.5"), ("a.lm", Some(0.5)));
        assert_eq!(parse_model_arg("c:/models/a.lm"), ("c:/models/a.lm", None));
        assert_eq!(parse_model_arg(":2"), (":2", None));
    }

    #[test]
    fn test_line_tokens() {
        assert_eq!(line_tokens("  we saw  whales "), ["<s>", "we", "saw", "whales"]);
        assert_eq!(line_tokens(""), ["<s>"]);
    }

    #[test]
    fn test_open_infers_kind() {
        let dir = tempfile::tempdir().unwrap();

        let unigram_path = dir.path().join("unigram.lm");
        let mut unigram = AnyModel::new(ModelKind::Unigram, 1);
        unigram
            .as_dynamic_mut()
            .learn_tokens(&line_tokens("a b"), true)
            .unwrap();
        unigram.as_dynamic().save(&unigram_path).unwrap();
        assert_eq!(AnyModel::open(&unigram_path, None).unwrap().kind(), ModelKind::Unigram);

        let kn_path = dir.path().join("kn.lm");
        let mut kn = AnyModel::new(ModelKind::KneserNey, 3);
        kn.as_dynamic_mut()
            .learn_tokens(&line_tokens("a b c"), true)
            .unwrap();
        kn.as_dynamic().save(&kn_path).unwrap();
        let opened = AnyModel::open(&kn_path, None).unwrap();
        assert_eq!(opened.kind(), ModelKind::Dynamic);
        assert_eq!(opened.as_dynamic().order(), 3);
        assert_eq!(opened.as_dynamic().ngram_count(&["a", "b", "c"]), 1);

        let opened = AnyModel::open(&kn_path, Some(ModelKind::KneserNey)).unwrap();
        assert_eq!(opened.kind(), ModelKind::KneserNey);
    }
}
