//! Workflow graph preparation before submission.

use rand::Rng;

/// Randomize the `seed` input of every `KSampler` node in a workflow
/// graph, so resubmitting the same graph produces a fresh generation
/// instead of a backend cache hit.
///
/// Returns the number of nodes touched. Nodes without an `inputs`
/// object, or whose class is not `KSampler`, are left alone.
pub fn randomize_seeds(workflow: &mut serde_json::Value) -> usize {
    let Some(nodes) = workflow.as_object_mut() else {
        return 0;
    };

    let mut rng = rand::rng();
    let mut touched = 0;

    for node in nodes.values_mut() {
        let is_sampler = node
            .get("class_type")
            .and_then(|c| c.as_str())
            .is_some_and(|c| c == "KSampler");
        if !is_sampler {
            continue;
        }
        if let Some(inputs) = node.get_mut("inputs").and_then(|i| i.as_object_mut()) {
            let seed: u64 = rng.random_range(0..10_000);
            inputs.insert("seed".to_string(), serde_json::json!(seed));
            touched += 1;
        }
    }

    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn randomizes_only_ksampler_nodes() {
        let mut workflow = json!({
            "3": {
                "class_type": "KSampler",
                "inputs": {"seed": 42, "steps": 20}
            },
            "4": {
                "class_type": "CheckpointLoaderSimple",
                "inputs": {"ckpt_name": "model.safetensors"}
            }
        });

        let touched = randomize_seeds(&mut workflow);

        assert_eq!(touched, 1);
        let seed = workflow["3"]["inputs"]["seed"].as_u64().unwrap();
        assert!(seed < 10_000);
        assert_eq!(workflow["4"]["inputs"]["ckpt_name"], "model.safetensors");
        // Other sampler inputs survive.
        assert_eq!(workflow["3"]["inputs"]["steps"], 20);
    }

    #[test]
    fn handles_multiple_samplers() {
        let mut workflow = json!({
            "3": {"class_type": "KSampler", "inputs": {"seed": 1}},
            "7": {"class_type": "KSampler", "inputs": {"seed": 2}}
        });

        assert_eq!(randomize_seeds(&mut workflow), 2);
    }

    #[test]
    fn sampler_without_inputs_is_skipped() {
        let mut workflow = json!({
            "3": {"class_type": "KSampler"}
        });

        assert_eq!(randomize_seeds(&mut workflow), 0);
    }

    #[test]
    fn non_object_workflow_is_noop() {
        let mut workflow = json!([1, 2, 3]);
        assert_eq!(randomize_seeds(&mut workflow), 0);
    }
}
