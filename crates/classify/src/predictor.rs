//! Schema-checked prediction over a loaded model.

use crate::features::FeatureVector;
use crate::model::{FeatureProjector, InferenceBackend, Model};
use media_butler_core::Result;
use serde::{Deserialize, Serialize};

/// Probability margin under which two labels count as tied
const TIE_EPSILON: f64 = 1e-6;

/// One ranked category with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    pub category: String,
    pub confidence: f64,
}

/// Raw prediction before decision mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
    /// Remaining labels sorted by descending confidence
    pub alternatives: Vec<RankedLabel>,
}

/// Maps feature vectors to calibrated categorical predictions.
///
/// Owns the loaded [`Model`] exclusively; the inference implementation is
/// swappable behind [`InferenceBackend`].
pub struct Predictor {
    model: Model,
    backend: Box<dyn InferenceBackend>,
    projector: FeatureProjector,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("model_version", &self.model.version)
            .field("labels", &self.model.labels.len())
            .finish()
    }
}

impl Predictor {
    /// Build a predictor from a model using the shipped logistic backend
    pub fn new(model: Model) -> Result<Self> {
        model.validate()?;
        let backend = Box::new(model.backend()?);
        let projector = FeatureProjector::new(backend.feature_dim());
        Ok(Self {
            model,
            backend,
            projector,
        })
    }

    /// Build a predictor with a custom inference backend
    pub fn with_backend(model: Model, backend: Box<dyn InferenceBackend>) -> Result<Self> {
        model.validate()?;
        let projector = FeatureProjector::new(backend.feature_dim());
        Ok(Self {
            model,
            backend,
            projector,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_version(&self) -> &str {
        &self.model.version
    }

    pub fn labels(&self) -> &[String] {
        self.backend.labels()
    }

    /// Predict the best label with up to `max_alternatives` runners-up.
    ///
    /// Labels whose probabilities are within 1e-6 are ordered
    /// lexicographically so the outcome never depends on float noise.
    pub fn predict(
        &self,
        features: &FeatureVector,
        max_alternatives: usize,
    ) -> Result<Prediction> {
        let projected = self.projector.project(features)?;
        let probabilities = self.backend.predict_probabilities(&projected)?;

        let labels = self.backend.labels();
        let mut ranked: Vec<RankedLabel> = labels
            .iter()
            .zip(probabilities.iter())
            .map(|(label, &p)| RankedLabel {
                category: label.clone(),
                confidence: f64::from(p).clamp(0.0, 1.0),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        // The epsilon relation is not a total order, so it cannot live in
        // the sort comparator. Repair adjacent pairs instead: two labels
        // within the margin are ordered lexicographically.
        let mut i = 1;
        while i < ranked.len() {
            if (ranked[i - 1].confidence - ranked[i].confidence).abs() <= TIE_EPSILON
                && ranked[i - 1].category > ranked[i].category
            {
                ranked.swap(i - 1, i);
                if i > 1 {
                    i -= 1;
                    continue;
                }
            }
            i += 1;
        }

        let best = ranked.remove(0);
        ranked.truncate(max_alternatives);

        Ok(Prediction {
            label: best.category,
            confidence: best.confidence,
            alternatives: ranked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureEngineer;
    use crate::model::{train_model, DEFAULT_FEATURE_DIM};
    use crate::tokenizer::Tokenizer;
    use crate::training::{SampleSource, TrainingSample};
    use media_butler_core::config::ClassifierConfig;
    use media_butler_core::error::MediaButlerError;
    use ndarray::Array1;

    fn sample(filename: &str, category: &str) -> TrainingSample {
        TrainingSample::new(filename, category, 1.0, SampleSource::ManuallyCurated)
    }

    fn trained_predictor() -> Predictor {
        let samples = vec![
            sample("Il.Trono.Di.Spade.8x04.ITA.WEBMux.x264-UBi.mkv", "IL TRONO DI SPADE"),
            sample("Il.Trono.Di.Spade.8x05.ITA.WEBMux.x264-UBi.mkv", "IL TRONO DI SPADE"),
            sample("One.Piece.1089.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv", "ONE PIECE"),
            sample("One.Piece.1090.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv", "ONE PIECE"),
            sample("Breaking.Bad.S05E16.1080p.BluRay.x264-NovaRip.mkv", "BREAKING BAD"),
            sample("Breaking.Bad.S05E14.1080p.BluRay.x264-NovaRip.mkv", "BREAKING BAD"),
        ];
        let model = train_model(&samples, &ClassifierConfig::default(), "1.0.0").unwrap();
        Predictor::new(model).unwrap()
    }

    fn features_for(filename: &str) -> crate::features::FeatureVector {
        let tokenization = Tokenizer::default().tokenize(filename).unwrap();
        FeatureEngineer::default().extract(&tokenization)
    }

    #[test]
    fn test_prediction_invariants() {
        let predictor = trained_predictor();
        let features = features_for("Il.Trono.Di.Spade.8x06.ITA.WEBMux.x264-UBi.mkv");
        let prediction = predictor.predict(&features, 3).unwrap();

        assert!((0.0..=1.0).contains(&prediction.confidence));
        assert!(predictor.labels().contains(&prediction.label));
        assert!(prediction.alternatives.len() <= 3);
        for pair in prediction.alternatives.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence - 1e-9);
        }

        let total: f64 = prediction.confidence
            + prediction
                .alternatives
                .iter()
                .map(|a| a.confidence)
                .sum::<f64>();
        assert!(total <= 1.0 + 1e-6);
    }

    #[test]
    fn test_predicted_label_matches_training() {
        let predictor = trained_predictor();
        let features = features_for("One.Piece.1095.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv");
        let prediction = predictor.predict(&features, 3).unwrap();
        assert_eq!(prediction.label, "ONE PIECE");
    }

    #[test]
    fn test_alternatives_capped() {
        let predictor = trained_predictor();
        let features = features_for("Breaking.Bad.S05E15.1080p.mkv");
        let prediction = predictor.predict(&features, 1).unwrap();
        assert_eq!(prediction.alternatives.len(), 1);
    }

    #[derive(Debug)]
    struct UniformBackend {
        labels: Vec<String>,
    }

    impl InferenceBackend for UniformBackend {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn feature_dim(&self) -> usize {
            DEFAULT_FEATURE_DIM
        }

        fn predict_probabilities(&self, _features: &Array1<f32>) -> Result<Array1<f32>> {
            let n = self.labels.len();
            Ok(Array1::from_elem(n, 1.0 / n as f32))
        }
    }

    #[test]
    fn test_tie_break_is_lexicographic() {
        let samples = vec![
            sample("Show.A.S01E01.mkv", "SHOW A"),
            sample("Show.B.S01E01.mkv", "SHOW B"),
        ];
        let model = train_model(&samples, &ClassifierConfig::default(), "1.0.0").unwrap();
        let backend = UniformBackend {
            labels: vec!["ZETA".to_string(), "ALFA".to_string(), "MEZZO".to_string()],
        };
        let predictor = Predictor::with_backend(model, Box::new(backend)).unwrap();

        let features = features_for("Anything.S01E01.mkv");
        let prediction = predictor.predict(&features, 2).unwrap();
        assert_eq!(prediction.label, "ALFA");
        assert_eq!(prediction.alternatives[0].category, "MEZZO");
        assert_eq!(prediction.alternatives[1].category, "ZETA");
    }

    #[derive(Debug)]
    struct FixedBackend {
        labels: Vec<String>,
        probabilities: Vec<f32>,
    }

    impl InferenceBackend for FixedBackend {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn feature_dim(&self) -> usize {
            DEFAULT_FEATURE_DIM
        }

        fn predict_probabilities(&self, _features: &Array1<f32>) -> Result<Array1<f32>> {
            Ok(Array1::from_vec(self.probabilities.clone()))
        }
    }

    #[test]
    fn test_tie_break_applies_between_pair_not_grid() {
        let samples = vec![
            sample("Show.A.S01E01.mkv", "SHOW A"),
            sample("Show.B.S01E01.mkv", "SHOW B"),
        ];
        let model = train_model(&samples, &ClassifierConfig::default(), "1.0.0").unwrap();
        // "BB" and "AA" differ by less than 1e-6; the winner must be the
        // lexicographically-first label, regardless of raw ordering.
        let backend = FixedBackend {
            labels: vec!["CC".to_string(), "BB".to_string(), "AA".to_string()],
            probabilities: vec![0.4, 0.300_000_6, 0.299_999_7],
        };
        let predictor = Predictor::with_backend(model, Box::new(backend)).unwrap();

        let features = features_for("Anything.S01E01.mkv");
        let prediction = predictor.predict(&features, 2).unwrap();
        assert_eq!(prediction.label, "CC");
        assert_eq!(prediction.alternatives[0].category, "AA");
        assert_eq!(prediction.alternatives[1].category, "BB");
    }

    #[test]
    fn test_swappable_backend_reports_own_schema() {
        let samples = vec![
            sample("Show.A.S01E01.mkv", "SHOW A"),
            sample("Show.B.S01E01.mkv", "SHOW B"),
        ];
        let model = train_model(&samples, &ClassifierConfig::default(), "1.0.0").unwrap();
        let predictor = Predictor::new(model).unwrap();
        assert_eq!(predictor.labels(), ["SHOW A", "SHOW B"]);
        assert_eq!(predictor.model_version(), "1.0.0");
    }

    #[test]
    fn test_invalid_model_rejected() {
        let samples = vec![
            sample("Show.A.S01E01.mkv", "SHOW A"),
            sample("Show.B.S01E01.mkv", "SHOW B"),
        ];
        let mut model = train_model(&samples, &ClassifierConfig::default(), "1.0.0").unwrap();
        model.labels.truncate(1);
        assert!(matches!(
            Predictor::new(model),
            Err(MediaButlerError::ModelValidationFailed(_))
        ));
    }
}
