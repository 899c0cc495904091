//! Native evaluation of XGBoost JSON models
//!
//! Supports the `gbtree` booster with a multi-class softmax objective.
//! Numeric splits send `x < threshold` left. Categorical splits send a
//! category that is in the node's set right and everything else left,
//! matching XGBoost's own traversal. Leaf values live in
//! `split_conditions`.

use super::features::FeatureSchema;
use super::{Classifier, ModelFormat};
use crate::domain::NUM_CLASSES;
use crate::models::{FeatureVector, NUM_FEATURES};
use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RawDocument {
    learner: RawLearner,
}

#[derive(Debug, Deserialize)]
struct RawLearner {
    #[serde(default)]
    feature_names: Vec<String>,
    #[serde(default)]
    feature_types: Vec<String>,
    gradient_booster: RawBooster,
    learner_model_param: RawLearnerParam,
    objective: RawObjective,
}

#[derive(Debug, Deserialize)]
struct RawBooster {
    name: String,
    model: Option<RawForest>,
}

#[derive(Debug, Deserialize)]
struct RawForest {
    tree_info: Vec<usize>,
    trees: Vec<RawTree>,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    #[serde(default)]
    split_type: Vec<u8>,
    #[serde(default)]
    categories: Vec<u32>,
    #[serde(default)]
    categories_nodes: Vec<usize>,
    #[serde(default)]
    categories_segments: Vec<usize>,
    #[serde(default)]
    categories_sizes: Vec<usize>,
}

/// Numeric parameters are stored as strings in the JSON format
#[derive(Debug, Deserialize)]
struct RawLearnerParam {
    base_score: String,
    num_class: String,
    num_feature: String,
}

#[derive(Debug, Deserialize)]
struct RawObjective {
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f64),
    Numeric {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Categorical {
        feature: usize,
        /// Sorted category codes that go right
        categories: Vec<u32>,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
    class: usize,
}

impl Tree {
    fn from_raw(raw: RawTree, class: usize) -> Result<Self> {
        let n = raw.left_children.len();
        ensure!(n > 0, "tree has no nodes");
        ensure!(
            raw.right_children.len() == n
                && raw.split_indices.len() == n
                && raw.split_conditions.len() == n,
            "tree arrays have inconsistent lengths"
        );
        ensure!(
            raw.split_type.is_empty() || raw.split_type.len() == n,
            "split_type has {} entries for {} nodes",
            raw.split_type.len(),
            n
        );
        ensure!(
            raw.categories_nodes.len() == raw.categories_segments.len()
                && raw.categories_nodes.len() == raw.categories_sizes.len(),
            "categorical split tables have inconsistent lengths"
        );

        let mut nodes = Vec::with_capacity(n);
        for idx in 0..n {
            let (l, r) = (raw.left_children[idx], raw.right_children[idx]);
            if l == -1 {
                nodes.push(Node::Leaf(raw.split_conditions[idx] as f64));
                continue;
            }

            // Children always come after their parent, so traversal terminates.
            let left = child_index(l, idx, n)?;
            let right = child_index(r, idx, n)?;
            let feature = usize::try_from(raw.split_indices[idx])
                .ok()
                .filter(|f| *f < NUM_FEATURES)
                .with_context(|| {
                    format!("node {} splits on feature {}", idx, raw.split_indices[idx])
                })?;

            let categorical = raw.split_type.get(idx).copied().unwrap_or(0) == 1;
            if categorical {
                let slot = raw
                    .categories_nodes
                    .iter()
                    .position(|node| *node == idx)
                    .with_context(|| format!("categorical node {} has no category set", idx))?;
                let start = raw.categories_segments[slot];
                let end = start
                    .checked_add(raw.categories_sizes[slot])
                    .with_context(|| format!("category segment of node {} overflows", idx))?;
                let mut categories = raw
                    .categories
                    .get(start..end)
                    .with_context(|| format!("category set of node {} is out of bounds", idx))?
                    .to_vec();
                categories.sort_unstable();
                nodes.push(Node::Categorical {
                    feature,
                    categories,
                    left,
                    right,
                });
            } else {
                nodes.push(Node::Numeric {
                    feature,
                    threshold: raw.split_conditions[idx],
                    left,
                    right,
                });
            }
        }

        Ok(Self { nodes, class })
    }

    fn leaf_value(&self, row: &[f32]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Numeric {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] < *threshold { *left } else { *right };
                }
                Node::Categorical {
                    feature,
                    categories,
                    left,
                    right,
                } => {
                    let value = row[*feature];
                    let chosen = value >= 0.0 && categories.binary_search(&(value as u32)).is_ok();
                    idx = if chosen { *right } else { *left };
                }
            }
        }
    }
}

fn child_index(raw: i64, parent: usize, n: usize) -> Result<usize> {
    match usize::try_from(raw) {
        Ok(child) if child > parent && child < n => Ok(child),
        _ => bail!("node {} has invalid child index {}", parent, raw),
    }
}

/// `"5E-1"`, `"[5E-1]"` or one value per class
fn parse_base_score(raw: &str) -> Result<[f64; NUM_CLASSES]> {
    let values: Vec<f64> = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid base_score {:?}", raw))?;

    match values.as_slice() {
        [single] => Ok([*single; NUM_CLASSES]),
        many if many.len() == NUM_CLASSES => {
            let mut out = [0.0; NUM_CLASSES];
            out.copy_from_slice(many);
            Ok(out)
        }
        _ => bail!("base_score has {} values, expected 1 or {}", values.len(), NUM_CLASSES),
    }
}

fn parse_param(name: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .with_context(|| format!("Invalid {} {:?}", name, raw))
}

/// Gradient-boosted tree ensemble loaded from an XGBoost JSON model
#[derive(Debug, Clone)]
pub struct XgbClassifier {
    trees: Vec<Tree>,
    base_margin: [f64; NUM_CLASSES],
}

impl XgbClassifier {
    /// Parse and validate a JSON model document
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let doc: RawDocument =
            serde_json::from_slice(bytes).context("Failed to parse XGBoost JSON model")?;
        let learner = doc.learner;

        let objective = learner.objective.name.as_str();
        ensure!(
            matches!(objective, "multi:softprob" | "multi:softmax"),
            "Unsupported objective {:?}, expected a multi-class softmax",
            objective
        );

        let num_class = parse_param("num_class", &learner.learner_model_param.num_class)?;
        ensure!(
            num_class == NUM_CLASSES,
            "Model has {} classes, expected {}",
            num_class,
            NUM_CLASSES
        );

        let num_feature = parse_param("num_feature", &learner.learner_model_param.num_feature)?;
        FeatureSchema::check(num_feature, &learner.feature_names, &learner.feature_types)
            .context("Model schema does not match the feature encoder")?;

        let base_margin = parse_base_score(&learner.learner_model_param.base_score)?;

        let booster = learner.gradient_booster;
        ensure!(
            booster.name == "gbtree",
            "Unsupported booster {:?}, expected gbtree",
            booster.name
        );
        let forest = booster.model.context("gbtree booster has no model")?;
        ensure!(
            forest.tree_info.len() == forest.trees.len(),
            "tree_info has {} entries for {} trees",
            forest.tree_info.len(),
            forest.trees.len()
        );

        let trees = forest
            .trees
            .into_iter()
            .zip(forest.tree_info)
            .enumerate()
            .map(|(i, (raw, class))| {
                ensure!(class < NUM_CLASSES, "tree {} is assigned to class {}", i, class);
                Tree::from_raw(raw, class).with_context(|| format!("Invalid tree {}", i))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(trees = trees.len(), objective = %objective, "XGBoost model parsed");

        Ok(Self { trees, base_margin })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Per-class margins before softmax
    pub fn margins(&self, features: &FeatureVector) -> [f64; NUM_CLASSES] {
        let row = features.as_slice();
        let mut margins = self.base_margin;
        for tree in &self.trees {
            margins[tree.class] += tree.leaf_value(row);
        }
        margins
    }
}

impl Classifier for XgbClassifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        Ok(softmax(&self.margins(features)))
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::XgboostJson
    }
}

fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::FEATURES;
    use serde_json::{json, Value};

    const WEIGHT: usize = 3;

    fn leaf(value: f64) -> Value {
        json!({
            "left_children": [-1],
            "right_children": [-1],
            "split_indices": [0],
            "split_conditions": [value],
            "split_type": [0],
            "categories": [],
            "categories_nodes": [],
            "categories_segments": [],
            "categories_sizes": []
        })
    }

    fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Value {
        json!({
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [feature, 0, 0],
            "split_conditions": [threshold, left, right],
            "split_type": [0, 0, 0],
            "categories": [],
            "categories_nodes": [],
            "categories_segments": [],
            "categories_sizes": [],
            "base_weights": [0.0, left, right],
            "default_left": [0, 0, 0]
        })
    }

    pub(crate) fn model_json(trees: Vec<Value>, tree_info: Vec<usize>) -> Value {
        let names: Vec<&str> = FEATURES.iter().map(|f| f.name).collect();
        let types: Vec<&str> = FEATURES
            .iter()
            .map(|f| if f.is_categorical() { "c" } else { "float" })
            .collect();
        json!({
            "learner": {
                "attributes": {},
                "feature_names": names,
                "feature_types": types,
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "gbtree_model_param": { "num_trees": trees.len().to_string() },
                        "tree_info": tree_info,
                        "trees": trees
                    }
                },
                "learner_model_param": {
                    "base_score": "5E-1",
                    "num_class": "7",
                    "num_feature": "16"
                },
                "objective": { "name": "multi:softprob" }
            },
            "version": [1, 7, 6]
        })
    }

    /// Normal weight below 80 kg, Obesity_Type_I above
    pub(crate) fn weight_model() -> Value {
        let trees = vec![
            leaf(0.0),
            stump(WEIGHT, 80.0, 2.0, -1.0),
            leaf(0.0),
            leaf(0.0),
            stump(WEIGHT, 80.0, -1.0, 2.0),
            leaf(0.0),
            leaf(0.0),
        ];
        model_json(trees, (0..7).collect())
    }

    fn row_with_weight(weight: f32) -> FeatureVector {
        let mut values = [1.0; NUM_FEATURES];
        values[WEIGHT] = weight;
        FeatureVector::new(values)
    }

    fn load(doc: &Value) -> Result<XgbClassifier> {
        XgbClassifier::from_slice(doc.to_string().as_bytes())
    }

    #[test]
    fn test_numeric_split_prediction() {
        let model = load(&weight_model()).unwrap();
        assert_eq!(model.num_trees(), 7);

        assert_eq!(model.predict(&row_with_weight(75.0)).unwrap(), 1);
        assert_eq!(model.predict(&row_with_weight(100.0)).unwrap(), 4);
        // threshold itself goes right
        assert_eq!(model.predict(&row_with_weight(80.0)).unwrap(), 4);
    }

    #[test]
    fn test_probabilities_are_softmax_of_margins() {
        let model = load(&weight_model()).unwrap();
        let margins = model.margins(&row_with_weight(75.0));
        assert_eq!(margins[1], 2.5);
        assert_eq!(margins[4], -0.5);
        assert_eq!(margins[0], 0.5);

        let probs = model.predict_proba(&row_with_weight(75.0)).unwrap();
        assert_eq!(probs.len(), NUM_CLASSES);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let expected_top = 2.5f64.exp() / (2.5f64.exp() + (-0.5f64).exp() + 5.0 * 0.5f64.exp());
        assert!((probs[1] - expected_top).abs() < 1e-9);
    }

    #[test]
    fn test_categorical_split() {
        // Class 6 tree: Gender (feature 0) in {1 = Male} goes right
        let mut trees: Vec<Value> = (0..6).map(|_| leaf(0.0)).collect();
        trees.push(json!({
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [0, 0, 0],
            "split_conditions": [0.0, -3.0, 3.0],
            "split_type": [1, 0, 0],
            "categories": [1],
            "categories_nodes": [0],
            "categories_segments": [0],
            "categories_sizes": [1]
        }));
        let model = load(&model_json(trees, (0..7).collect())).unwrap();

        let mut male = [0.0; NUM_FEATURES];
        male[0] = 1.0;
        assert_eq!(model.predict(&FeatureVector::new(male)).unwrap(), 6);

        let female = [0.0; NUM_FEATURES];
        let probs = model.predict_proba(&FeatureVector::new(female)).unwrap();
        assert!(probs[6] < probs[0]);
    }

    #[test]
    fn test_vector_base_score() {
        let margins = parse_base_score("[1E-1,2E-1,3E-1,4E-1,5E-1,6E-1,7E-1]").unwrap();
        assert_eq!(margins[6], 0.7);
        assert_eq!(parse_base_score("5E-1").unwrap(), [0.5; NUM_CLASSES]);
        assert!(parse_base_score("[1,2]").is_err());
        assert!(parse_base_score("half").is_err());
    }

    #[test]
    fn test_rejects_wrong_class_count() {
        let mut doc = weight_model();
        doc["learner"]["learner_model_param"]["num_class"] = json!("3");
        let err = load(&doc).unwrap_err();
        assert!(err.to_string().contains("classes"));
    }

    #[test]
    fn test_rejects_binary_objective() {
        let mut doc = weight_model();
        doc["learner"]["objective"]["name"] = json!("binary:logistic");
        assert!(load(&doc).is_err());
    }

    #[test]
    fn test_rejects_schema_mismatch() {
        let mut doc = weight_model();
        doc["learner"]["feature_names"][0] = json!("Sex");
        let err = load(&doc).unwrap_err();
        assert!(format!("{:#}", err).contains("feature names"));

        let mut doc = weight_model();
        doc["learner"]["learner_model_param"]["num_feature"] = json!("17");
        assert!(load(&doc).is_err());
    }

    #[test]
    fn test_rejects_malformed_trees() {
        // child pointing backwards would loop forever
        let mut doc = weight_model();
        doc["learner"]["gradient_booster"]["model"]["trees"][1]["left_children"] = json!([0, -1, -1]);
        assert!(load(&doc).is_err());

        // split on a column the encoder never produces
        let mut doc = weight_model();
        doc["learner"]["gradient_booster"]["model"]["trees"][1]["split_indices"] = json!([16, 0, 0]);
        assert!(load(&doc).is_err());

        // tree assigned to an unknown class
        let mut doc = weight_model();
        doc["learner"]["gradient_booster"]["model"]["tree_info"][0] = json!(7);
        assert!(load(&doc).is_err());
    }

    #[test]
    fn test_rejects_corrupt_category_segments() {
        let categorical_tree = |segment: Value| {
            let mut trees: Vec<Value> = (0..6).map(|_| leaf(0.0)).collect();
            trees.push(json!({
                "left_children": [1, -1, -1],
                "right_children": [2, -1, -1],
                "split_indices": [0, 0, 0],
                "split_conditions": [0.0, -3.0, 3.0],
                "split_type": [1, 0, 0],
                "categories": [1],
                "categories_nodes": [0],
                "categories_segments": [segment],
                "categories_sizes": [1]
            }));
            model_json(trees, (0..7).collect())
        };

        let err = load(&categorical_tree(json!(u64::MAX))).unwrap_err();
        assert!(format!("{:#}", err).contains("overflows"));

        let err = load(&categorical_tree(json!(5))).unwrap_err();
        assert!(format!("{:#}", err).contains("out of bounds"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(XgbClassifier::from_slice(b"not json").is_err());
        assert!(XgbClassifier::from_slice(b"{}").is_err());
    }
}
