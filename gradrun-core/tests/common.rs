use gradrun_core::Tensor;

// Shared by several integration test crates; not every crate uses every helper.
#[allow(dead_code)]
pub fn f32_tensor(data: Vec<f32>, shape: Vec<usize>) -> Tensor {
    Tensor::from_vec(data, shape).expect("Test tensor creation failed")
}

#[allow(dead_code)]
pub fn f64_tensor(data: Vec<f64>, shape: Vec<usize>) -> Tensor {
    Tensor::from_vec(data, shape).expect("Test tensor creation failed")
}

/// Routes `log` output to the test harness. Safe to call from every test.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
