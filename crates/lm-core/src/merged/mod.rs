//! Composite models that merge the predictions of several components.
//!
//! Components are borrowed, so a composite cannot outlive them. Each
//! strategy folds the normalized component predictions into one
//! word-to-probability map; ranking and truncation happen afterwards.


use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::model::{normalized_probability, LanguageModel, Prediction};
use crate::settings::settings;
use crate::vocab::PredictOptions;

/// How component predictions are combined.
pub trait MergeStrategy {
    /// Whether components may truncate their own results to the limit
    /// without changing the merged outcome.
    const CAN_LIMIT: bool;

    /// Whether the merged values need rescaling to form a distribution.
    const NEEDS_NORMALIZATION: bool;

    /// Value a word starts from before the first component that has it.
    const INITIAL: f64;

    /// Per-component weights as applied by `merge`.
    fn effective_weights(weights: &[f64]) -> Vec<f64> {
        weights.to_vec()
    }

    /// Fold one component's prediction into the merged value.
    fn merge(merged: &mut f64, probability: f64, weight: f64);

    /// Direct probability of an n-gram, if the strategy has a closed form.
    fn probability(
        _components: &[&dyn LanguageModel],
        _weights: &[f64],
        _ngram: &[&str],
    ) -> Option<f64> {
        None
    }
}

/// Later components replace the probabilities of earlier ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlay;

/// `sum(w_i / sum(w) * p_i)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linint;

/// `prod(p_i ^ w_i)`, rescaled after truncation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Loglinint;

impl MergeStrategy for Overlay {
    const CAN_LIMIT: bool = true;
    const NEEDS_NORMALIZATION: bool = true;
    const INITIAL: f64 = 0.0;

    fn merge(merged: &mut f64, probability: f64, _weight: f64) {
        *merged = probability;
    }
}

impl MergeStrategy for Linint {
    const CAN_LIMIT: bool = false;
    const NEEDS_NORMALIZATION: bool = false;
    const INITIAL: f64 = 0.0;

    fn effective_weights(weights: &[f64]) -> Vec<f64> {
        let sum: f64 = weights.iter().sum();
        weights
            .iter()
            .map(|w| if sum > 0.0 { w / sum } else { 0.0 })
            .collect()
    }

    fn merge(merged: &mut f64, probability: f64, weight: f64) {
        *merged += weight * probability;
    }

    fn probability(
        components: &[&dyn LanguageModel],
        weights: &[f64],
        ngram: &[&str],
    ) -> Option<f64> {
        Some(
            components
                .iter()
                .zip(Self::effective_weights(weights))
                .map(|(c, w)| w * c.probability(ngram))
                .sum(),
        )
    }
}

impl MergeStrategy for Loglinint {
    const CAN_LIMIT: bool = false;
    const NEEDS_NORMALIZATION: bool = true;
    const INITIAL: f64 = 1.0;

    fn merge(merged: &mut f64, probability: f64, weight: f64) {
        *merged *= probability.powf(weight);
    }
}

/// A composite over borrowed component models.
pub struct MergedModel<'a, S: MergeStrategy> {
    components: Vec<&'a dyn LanguageModel>,
    weights: Vec<f64>,
    strategy: PhantomData<S>,
}

pub type OverlayModel<'a> = MergedModel<'a, Overlay>;
pub type LinintModel<'a> = MergedModel<'a, Linint>;
pub type LoglinintModel<'a> = MergedModel<'a, Loglinint>;

impl<'a, S: MergeStrategy> MergedModel<'a, S> {
    pub fn new(components: Vec<&'a dyn LanguageModel>) -> Self {
        Self {
            components,
            weights: Vec::new(),
            strategy: PhantomData,
        }
    }

    pub fn with_weights(components: Vec<&'a dyn LanguageModel>, weights: &[f64]) -> Self {
        let mut model = Self::new(components);
        model.set_weights(weights);
        model
    }

    pub fn components(&self) -> &[&'a dyn LanguageModel] {
        &self.components
    }

    pub fn set_components(&mut self, components: Vec<&'a dyn LanguageModel>) {
        self.components = components;
    }

    /// Weights as given; missing ones default when the model is queried.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn set_weights(&mut self, weights: &[f64]) {
        self.weights = weights.to_vec();
    }

    /// One weight per component, padded with the configured default.
    fn padded_weights(&self) -> Vec<f64> {
        let default = settings().composition.default_weight;
        let mut weights = self.weights.clone();
        weights.resize(self.components.len(), default);
        weights
    }
}

impl<S: MergeStrategy> LanguageModel for MergedModel<'_, S> {
    fn predict(
        &self,
        context: &[&str],
        limit: Option<usize>,
        options: PredictOptions,
    ) -> Vec<Prediction> {
        let mut component_options = options | PredictOptions::NORMALIZE;
        if !S::CAN_LIMIT {
            component_options |= PredictOptions::NO_SORT;
        }
        let component_limit = if S::CAN_LIMIT { limit } else { None };

        let weights = S::effective_weights(&self.padded_weights());
        let mut merged: BTreeMap<String, f64> = BTreeMap::new();
        for (component, &weight) in self.components.iter().zip(&weights) {
            for p in component.predict(context, component_limit, component_options) {
                let value = merged.entry(p.word).or_insert(S::INITIAL);
                S::merge(value, p.probability, weight);
            }
        }

        let mut results: Vec<Prediction> = merged
            .into_iter()
            .map(|(word, probability)| Prediction { word, probability })
            .collect();
        if !options.contains(PredictOptions::NO_SORT) {
            results.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        }
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        if options.contains(PredictOptions::NORMALIZE) && S::NEEDS_NORMALIZATION {
            normalize(&mut results);
        }
        results
    }

    fn probability(&self, ngram: &[&str]) -> f64 {
        S::probability(&self.components, &self.padded_weights(), ngram)
            .unwrap_or_else(|| normalized_probability(self, ngram))
    }
}

/// Rescale to a sum of one; an all-zero set is left alone.
fn normalize(results: &mut [Prediction]) {
    let sum: f64 = results.iter().map(|r| r.probability).sum();
    if sum > 0.0 {
        for r in results {
            r.probability /= sum;
        }
    }
}
