use super::Tensor;
use crate::device::StorageDevice;
use crate::error::GradrunError;
use approx::assert_relative_eq;

#[test]
fn test_accumulate_sums_elementwise() {
    let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0], vec![3]).unwrap();
    let b = Tensor::from_vec(vec![0.5f32, -2.0, 10.0], vec![3]).unwrap();
    let c = a.accumulate(&b).unwrap();
    assert_eq!(c.to_vec::<f32>().unwrap(), vec![1.5, 0.0, 13.0]);
}

#[test]
fn test_accumulate_rejects_shape_mismatch() {
    let a = Tensor::from_vec(vec![1.0f32, 2.0], vec![2]).unwrap();
    let b = Tensor::from_vec(vec![1.0f32, 2.0, 3.0], vec![3]).unwrap();
    match a.accumulate(&b) {
        Err(GradrunError::TypeContractViolation { predicate, .. }) => {
            assert!(predicate.contains("shape"), "unexpected predicate {predicate}")
        }
        other => panic!("expected a type violation, got {:?}", other),
    }
}

#[test]
fn test_accumulate_reports_rank_before_shape() {
    let a = Tensor::from_vec(vec![1.0f32, 2.0], vec![2]).unwrap();
    let b = Tensor::from_vec(vec![1.0f32, 2.0], vec![2, 1]).unwrap();
    match a.accumulate(&b) {
        Err(GradrunError::TypeContractViolation { predicate, .. }) => {
            assert!(predicate.contains("ndim"), "unexpected predicate {predicate}")
        }
        other => panic!("expected a type violation, got {:?}", other),
    }
}

#[test]
fn test_accumulate_rejects_integer_tensors() {
    let a = Tensor::from_vec(vec![1i32], vec![1]).unwrap();
    assert!(matches!(
        a.accumulate(&a),
        Err(GradrunError::TypeContractViolation { .. })
    ));
}

#[test]
fn test_scale_and_sum() {
    let a = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
    let scaled = a.scale(-0.5).unwrap();
    assert_eq!(scaled.to_vec::<f64>().unwrap(), vec![-0.5, -1.0, -1.5, -2.0]);
    let total = a.sum_all().unwrap();
    assert_eq!(total.shape(), &[] as &[usize]);
    assert_relative_eq!(total.item().unwrap(), 10.0);
}

#[cfg(feature = "accelerator")]
#[test]
fn test_accelerator_math_matches_cpu() {
    let a = Tensor::from_vec((0..1000).map(|i| i as f32 * 0.001).collect(), vec![1000]).unwrap();
    let b = a.scale(2.0).unwrap();
    let cpu = a.mul_elementwise(&b).unwrap().sum_all().unwrap();

    let a_acc = a.to_device(StorageDevice::Accelerator).unwrap();
    let b_acc = b.to_device(StorageDevice::Accelerator).unwrap();
    let acc = a_acc.mul_elementwise(&b_acc).unwrap().sum_all().unwrap();

    assert_eq!(acc.device(), StorageDevice::Accelerator);
    assert_relative_eq!(cpu.item().unwrap(), acc.item().unwrap(), max_relative = 1e-5);
}

#[test]
fn test_mixed_devices_are_rejected() {
    let a = Tensor::from_vec(vec![1.0f32], vec![1]).unwrap();
    if let Ok(b) = a.to_device(StorageDevice::Accelerator) {
        assert!(matches!(
            a.accumulate(&b),
            Err(GradrunError::TypeContractViolation { .. })
        ));
    }
}

#[test]
fn test_allclose() {
    let a = Tensor::from_vec(vec![1.0f32, 2.0], vec![2]).unwrap();
    let b = Tensor::from_vec(vec![1.0f32, 2.000001], vec![2]).unwrap();
    assert!(a.allclose(&b, 1e-5, 1e-5));
    let c = Tensor::from_vec(vec![1.0f32, 2.1], vec![2]).unwrap();
    assert!(!a.allclose(&c, 1e-5, 1e-5));
}
