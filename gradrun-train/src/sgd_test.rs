use super::*;
use approx::assert_relative_eq;

fn param(name: &str, data: Vec<f64>) -> Parameter {
    let len = data.len();
    Parameter::new(name, Tensor::from_vec(data, vec![len]).unwrap())
}

fn grad(data: Vec<f64>) -> Option<Tensor> {
    let len = data.len();
    Some(Tensor::from_vec(data, vec![len]).unwrap())
}

fn values(p: &Parameter) -> Vec<f64> {
    p.value().to_vec::<f64>().unwrap()
}

#[test]
fn test_sgd_step() {
    let mut params = vec![param("w", vec![1.0, 2.0]), param("b", vec![5.0])];
    let mut sgd = Sgd::new(0.1).unwrap();

    sgd.update(&mut params, &[grad(vec![10.0, -20.0]), None]).unwrap();

    let w = values(&params[0]);
    assert_relative_eq!(w[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(w[1], 4.0, epsilon = 1e-12);
    assert_eq!(values(&params[1]), vec![5.0]);
    assert_eq!(sgd.t(), 1);
}

#[test]
fn test_sgd_hyperparameters() {
    let mut sgd = Sgd::default();
    assert_eq!(sgd.hyperparam("lr"), Some(Sgd::DEFAULT_LR));
    assert_eq!(sgd.hyperparam("momentum"), None);

    sgd.set_hyperparam("lr", -2.0).unwrap();
    assert_eq!(sgd.lr(), -2.0);
    assert!(matches!(
        sgd.set_hyperparam("beta", 0.5),
        Err(GradrunError::ConfigurationError(_))
    ));
    assert!(sgd.set_hyperparam("lr", f64::NAN).is_err());
    assert!(Sgd::new(f64::INFINITY).is_err());
}

#[test]
fn test_sgd_rejects_mismatched_gradients() {
    let mut params = vec![param("w", vec![1.0, 2.0])];
    let mut sgd = Sgd::new(0.1).unwrap();

    let err = sgd.update(&mut params, &[]).unwrap_err();
    assert!(matches!(err, GradrunError::TypeContractViolation { .. }));

    let err = sgd.update(&mut params, &[grad(vec![1.0])]).unwrap_err();
    match err {
        GradrunError::TypeContractViolation { predicate, .. } => {
            assert_eq!(predicate, "grads[0].shape == params[0].shape");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(values(&params[0]), vec![1.0, 2.0]);
    assert_eq!(sgd.t(), 0);
}

#[test]
fn test_momentum_sgd_accumulates_velocity() {
    let mut params = vec![param("w", vec![1.0])];
    let mut opt = MomentumSgd::new(0.1, 0.5).unwrap();

    opt.update(&mut params, &[grad(vec![1.0])]).unwrap();
    assert_relative_eq!(values(&params[0])[0], 0.9, epsilon = 1e-12);

    opt.update(&mut params, &[grad(vec![1.0])]).unwrap();
    assert_relative_eq!(values(&params[0])[0], 0.75, epsilon = 1e-12);
    let v = opt.velocity("w").unwrap().to_vec::<f64>().unwrap();
    assert_relative_eq!(v[0], -0.15, epsilon = 1e-12);
}

#[test]
fn test_momentum_range_is_validated() {
    assert!(MomentumSgd::new(0.1, 1.0).is_err());
    assert!(MomentumSgd::new(0.1, -0.1).is_err());
    let mut opt = MomentumSgd::default();
    assert_eq!(opt.hyperparam_names(), &["lr", "momentum"]);
    opt.set_hyperparam("momentum", 0.0).unwrap();
    assert_eq!(opt.hyperparam("momentum"), Some(0.0));
}
