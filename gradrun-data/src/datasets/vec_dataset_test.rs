// gradrun-data/src/datasets/vec_dataset_test.rs

use super::*;

#[test]
fn test_vec_dataset_new() {
    let dataset = VecDataset::new(vec![1, 2, 3, 4, 5]);
    assert_eq!(dataset.len(), 5);
    assert!(!dataset.is_empty());
}

#[test]
fn test_vec_dataset_get_valid_index() {
    let dataset = VecDataset::new(vec![10, 20, 30]);
    assert_eq!(dataset.get(0).unwrap(), 10);
    assert_eq!(dataset.get(2).unwrap(), 30);
}

#[test]
fn test_vec_dataset_get_invalid_index() {
    let dataset: VecDataset<i32> = VecDataset::new(vec![10, 20, 30]);
    assert_eq!(
        dataset.get(3),
        Err(GradrunError::IndexOutOfBounds { index: 3, len: 3 })
    );
}

#[test]
fn test_vec_dataset_empty() {
    let dataset: VecDataset<String> = VecDataset::new(vec![]);
    assert!(dataset.is_empty());
}
