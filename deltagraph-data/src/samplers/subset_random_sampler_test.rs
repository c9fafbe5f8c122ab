use super::*;
use std::collections::HashSet;

#[test]
fn test_subset_random_sampler_len() {
    assert_eq!(SubsetRandomSampler::new(vec![], 0).len(10), 0);
    assert_eq!(SubsetRandomSampler::new(vec![10, 20, 5], 0).len(100), 3);
}

#[test]
fn test_subset_random_sampler_is_a_permutation() {
    let source = vec![1, 5, 2, 8, 3];
    let sampler = SubsetRandomSampler::new(source.clone(), 7);
    let out: Vec<usize> = sampler.iter(100).collect();
    assert_eq!(out.len(), source.len());
    let out_set: HashSet<usize> = out.into_iter().collect();
    let source_set: HashSet<usize> = source.into_iter().collect();
    assert_eq!(out_set, source_set);
}

#[test]
fn test_same_seed_same_order() {
    let a: Vec<usize> = SubsetRandomSampler::full(100, 42).iter(100).collect();
    let b: Vec<usize> = SubsetRandomSampler::full(100, 42).iter(100).collect();
    assert_eq!(a, b);
}

#[test]
fn test_seed_changes_order() {
    let sampler = SubsetRandomSampler::full(100, 1);
    let first: Vec<usize> = sampler.iter(100).collect();
    let second: Vec<usize> = sampler.clone().with_seed(2).iter(100).collect();
    assert_ne!(first, second);
    assert_eq!(sampler.seed(), 1);
}
