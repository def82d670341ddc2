// End-to-end behaviour of the layered network: prediction, construction rules and training.

use approx::assert_relative_eq;
use rand::{rngs::StdRng, SeedableRng};

use layernet::feedforward::{
    activate, ActivationKind, ActivationParams, InvalidLayerIndex, Net, NetConfig, NewNetError,
    SoftmaxDerivative, TopologyError, TrainingExample,
};

fn seeded_net(geometry: &[usize], seed: u64) -> Net {
    let mut rng = StdRng::seed_from_u64(seed);
    Net::with_rng(geometry, true, &NetConfig::default(), &mut rng).unwrap()
}

// Trains on one example and returns the squared error after every step.
fn training_curve(net: Net, example: &TrainingExample, learning_rate: f64, steps: usize) -> Vec<f64> {
    let mut trainer = net.build_trainer();
    let mut costs = Vec::with_capacity(steps + 1);

    let outputs = trainer.net_mut().process(example.input()).unwrap().to_vec();
    costs.push(Net::calc_cost(&outputs, example.target()).unwrap());

    for _ in 0..steps {
        trainer.train(example, learning_rate).unwrap();
        let outputs = trainer.net_mut().process(example.input()).unwrap().to_vec();
        costs.push(Net::calc_cost(&outputs, example.target()).unwrap());
    }
    costs
}

fn assert_converges(costs: &[f64]) {
    for pair in costs.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-15, "cost went up: {} -> {}", pair[0], pair[1]);
    }
    let (first, last) = (costs[0], costs[costs.len() - 1]);
    assert!(last < first * 0.01, "cost {} -> {}", first, last);
}

#[test]
fn zero_net_predicts_half_everywhere() {
    let mut net = Net::new(&[2, 3, 1], false).unwrap();
    for input in [[0.0, 0.0], [1.0, -1.0], [123.0, 0.001]].iter() {
        assert_eq!(net.process(input).unwrap(), &[0.5]);
    }
}

#[test]
fn identity_linear_net() {
    let coefficients = vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let mut net = Net::with_coefficients(&[2, 2], coefficients, &NetConfig::default()).unwrap();
    net.set_activation(0, ActivationKind::Linear).unwrap();
    net.set_activation(1, ActivationKind::Linear).unwrap();
    assert_eq!(net.process(&[1.0, 2.0]).unwrap(), &[1.0, 2.0]);
}

#[test]
fn invalid_topologies() {
    assert!(matches!(
        Net::new(&[0, 2], true),
        Err(NewNetError::InvalidTopology(TopologyError::EmptyLayer { index: 0 }))
    ));
    assert!(matches!(
        Net::new(&[3], true),
        Err(NewNetError::InvalidTopology(TopologyError::TooFewLayers(1)))
    ));
}

#[test]
fn layer_index_out_of_range() {
    let mut net = Net::new(&[2, 2, 2], false).unwrap();
    assert_eq!(
        net.set_activation(3, ActivationKind::Tanh),
        Err(InvalidLayerIndex {
            index: 3,
            layer_count: 3
        })
    );
    assert_eq!(net.activation(2), Some(ActivationKind::Sigmoid));
}

#[test]
fn zero_initialization_is_deterministic() {
    let input = [0.7, -0.2, 1.3];
    let mut a = Net::new(&[3, 4, 4, 2], false).unwrap();
    let mut b = Net::new(&[3, 4, 4, 2], false).unwrap();
    for layer in 1..4 {
        a.set_activation(layer, ActivationKind::Tanh).unwrap();
        b.set_activation(layer, ActivationKind::Tanh).unwrap();
    }
    assert_eq!(a.process(&input).unwrap(), b.process(&input).unwrap());
}

#[test]
fn prediction_is_repeatable() {
    let mut net = seeded_net(&[3, 5, 2], 1);
    let first = net.process(&[0.1, 0.2, 0.3]).unwrap().to_vec();
    net.process(&[-4.0, 2.0, 9.0]).unwrap();
    assert_eq!(net.process(&[0.1, 0.2, 0.3]).unwrap(), &first[..]);
}

#[test]
fn softmax_sums_to_one() {
    let params = ActivationParams::default();
    for input in [
        vec![1000.0, 1000.0001],
        vec![-1000.0, 0.0, 1000.0],
        vec![1e-9],
        vec![3.0, 3.0, 3.0, 3.0],
    ]
    .iter()
    {
        let res = activate(ActivationKind::SoftMax, &params, input, false).unwrap();
        assert!(res.activations.iter().all(|a| a.is_finite()));
        assert_relative_eq!(res.activations.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn sigmoid_net_converges_on_one_example() {
    let example = TrainingExample::new(vec![0.3, 0.7], vec![0.8]).unwrap();
    let costs = training_curve(seeded_net(&[2, 3, 1], 5), &example, 0.1, 1000);
    assert_converges(&costs);
}

#[test]
fn linear_output_converges_on_one_example() {
    let example = TrainingExample::new(vec![1.0, -0.5, 0.25], vec![2.0, -1.0]).unwrap();
    let mut net = seeded_net(&[3, 4, 2], 9);
    net.set_activation(2, ActivationKind::Linear).unwrap();

    let costs = training_curve(net, &example, 0.02, 1000);
    assert_converges(&costs);
}

#[test]
fn exact_jacobian_softmax_output_learns() {
    let config = NetConfig {
        activation: ActivationParams {
            softmax_derivative: SoftmaxDerivative::ExactJacobian,
            ..ActivationParams::default()
        },
        ..NetConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(21);
    let mut net = Net::with_rng(&[2, 4, 3], true, &config, &mut rng).unwrap();
    net.set_activation(2, ActivationKind::SoftMax).unwrap();

    let example = TrainingExample::new(vec![0.5, -0.5], vec![0.0, 1.0, 0.0]).unwrap();
    let mut trainer = net.build_trainer();
    for _ in 0..500 {
        // Softmax outputs sum to one, so do the targets: the signed residuals cancel.
        let error = trainer.train(&example, 0.5).unwrap();
        assert_relative_eq!(error, 0.0, epsilon = 1e-12);
    }

    let outputs = trainer.net_mut().process(example.input()).unwrap();
    assert!(outputs[1] > outputs[0] && outputs[1] > outputs[2]);
    assert!(outputs[1] > 0.5);
}

#[test]
fn exact_jacobian_step_follows_numeric_gradient() {
    let geometry = [3, 4, 3];
    let config = NetConfig {
        activation: ActivationParams {
            softmax_derivative: SoftmaxDerivative::ExactJacobian,
            ..ActivationParams::default()
        },
        ..NetConfig::default()
    };
    let example = TrainingExample::new(vec![0.4, -0.9, 1.2], vec![0.1, 0.7, 0.2]).unwrap();

    // Half the squared error for the given coefficients.
    let half_cost = |coefficients: &[f64]| -> f64 {
        let mut net = Net::with_coefficients(&geometry, coefficients.to_vec(), &config).unwrap();
        net.set_activation(2, ActivationKind::SoftMax).unwrap();
        let outputs = net.process(example.input()).unwrap().to_vec();
        0.5 * Net::calc_cost(&outputs, example.target()).unwrap()
    };

    let mut rng = StdRng::seed_from_u64(33);
    let mut net = Net::with_rng(&geometry, true, &config, &mut rng).unwrap();
    net.set_activation(2, ActivationKind::SoftMax).unwrap();
    let before = net.export().1.to_vec();

    let learning_rate = 1e-3;
    let mut trainer = net.build_trainer();
    trainer.train(&example, learning_rate).unwrap();
    let after = trainer.net_ref().export().1.to_vec();

    let step = 1e-6;
    for i in 0..before.len() {
        let mut plus = before.clone();
        plus[i] += step;
        let mut minus = before.clone();
        minus[i] -= step;

        let numeric = (half_cost(&plus) - half_cost(&minus)) / (2.0 * step);
        let applied = (before[i] - after[i]) / learning_rate;
        assert_relative_eq!(applied, numeric, epsilon = 1e-7);
    }
}

#[test]
fn training_examples_from_json() {
    let examples: Vec<TrainingExample> = serde_json::from_str(
        r#"[
            { "Input": [0.0, 1.0], "Target": [1.0] },
            { "Input": [1.0, 0.0], "Target": [0.0] }
        ]"#,
    )
    .unwrap();

    let mut trainer = Net::new(&[2, 2, 1], false).unwrap().build_trainer();
    let mean = trainer.train_epoch(&examples, 0.1).unwrap();
    // Residuals are 0.5 - 1 and roughly 0.5 - 0, so they nearly cancel.
    assert!(mean.abs() < 0.5);
    assert_eq!(trainer.steps(), 2);
}
