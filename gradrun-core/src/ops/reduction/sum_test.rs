use super::sum::sum_op;
use crate::autograd::gradient_check::check_backward;
use crate::autograd::Graph;
use crate::tensor::Tensor;
use approx::assert_relative_eq;

#[test]
fn test_sum_to_scalar() {
    let mut graph = Graph::new();
    let x = graph.variable(Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap());
    let y = sum_op(&mut graph, x).unwrap();
    let out = graph.data(y).unwrap();
    assert_eq!(out.ndim(), 0);
    assert_relative_eq!(out.item().unwrap(), 21.0);

    graph.backward(y).unwrap();
    let gx = graph.grad(x).unwrap().unwrap();
    assert_eq!(gx.shape(), &[2, 3]);
    assert_eq!(gx.to_vec::<f32>().unwrap(), vec![1.0; 6]);
}

#[test]
fn test_sum_gradient_check() {
    let x = Tensor::from_vec(vec![0.5f64, -1.5, 2.25], vec![3]).unwrap();
    let gy = Tensor::scalar(-2.0f64);
    let result = check_backward(|g, ids| sum_op(g, ids[0]), &[x], Some(&gy), 1e-6, 1e-7, 1e-5);
    assert!(result.is_ok(), "{:?}", result);
}
