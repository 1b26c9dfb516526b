use functionalize::dispatch::{
    compute_dispatch_key_set, DispatchKey, DispatchKeySet, ExcludeDispatchKeyGuard,
    EXCLUDE_KEYS_FOR_META_DISPATCH,
};
use functionalize::evalue::EValue;
use functionalize::meta::{infer_meta, to_meta, TensorListRef};
use functionalize::overlap::{has_internal_overlap, has_internal_overlap_helper, MemOverlap};
use functionalize::tensor::{
    empty_strided_meta_symint, Device, Layout, ScalarType, SymInt, Symbol, Tensor,
};

fn assert_meta_of(t: &Tensor, m: &Tensor) {
    assert_eq!(m.device(), Device::META);
    assert_eq!(m.sym_sizes(), t.sym_sizes());
    assert_eq!(m.sym_strides(), t.sym_strides());
    assert_eq!(m.scalar_type(), t.scalar_type());
    assert_eq!(m.layout(), t.layout());
    assert!(m.data_bytes().is_none());
}

#[test]
fn contiguous_float_matrix() {
    let t = Tensor::from_slice(&[0.5_f64; 6], &[2, 3]).unwrap();
    let m = to_meta(&t).unwrap();
    assert_meta_of(&t, &m);
    assert_eq!(m.sizes(), vec![2, 3]);
    assert_eq!(m.strides(), vec![3, 1]);
    assert_eq!(m.scalar_type(), ScalarType::Double);
    assert_eq!(m.layout(), Layout::Strided);
    assert!(!m.has_storage());
}

#[test]
fn list_of_three_with_undefined_middle() {
    let first = Tensor::from_slice(&[1_i32, 2, 3, 4], &[4]).unwrap();
    let third = Tensor::zeros(&[2, 2], ScalarType::Half).unwrap();
    let list = [first.clone(), Tensor::undefined(), third.clone()];

    let metas = to_meta(&TensorListRef::from_slice(&list)).unwrap();
    assert_eq!(metas.len(), 3);
    assert_meta_of(&first, &metas[0]);
    assert!(!metas[1].defined());
    assert_meta_of(&third, &metas[2]);
}

#[test]
fn optional_arguments() {
    let t = Tensor::from_slice(&[1_u8, 2], &[2]).unwrap();
    assert!(to_meta(&None::<Tensor>).unwrap().is_none());
    assert_meta_of(&t, &to_meta(&Some(t.clone())).unwrap().unwrap());

    let metas = to_meta(&vec![Some(t.clone()), None, Some(Tensor::undefined())]).unwrap();
    assert_eq!(metas.len(), 3);
    assert_meta_of(&t, metas[0].as_ref().unwrap());
    assert!(metas[1].is_none());
    assert!(!metas[2].as_ref().unwrap().defined());
}

#[test]
fn indeterminate_overlap_is_not_overlap() {
    let t = Tensor::from_slice(&[1.0_f32, 2.0, 3.0, 4.0], &[4]).unwrap();
    let complex = t.as_strided(&[2, 2], &[1, 1], 0).unwrap();
    assert_eq!(has_internal_overlap(&complex), MemOverlap::TooHard);
    assert!(!has_internal_overlap_helper(&complex));

    let expanded = t.as_strided(&[3, 4], &[0, 1], 0).unwrap();
    assert_eq!(has_internal_overlap(&expanded), MemOverlap::Yes);
    assert!(has_internal_overlap_helper(&expanded));

    // the meta projection keeps the verdict, as it keeps the strides
    assert!(has_internal_overlap_helper(&to_meta(&expanded).unwrap()));
    assert!(!has_internal_overlap_helper(&to_meta(&complex).unwrap()));
}

#[test]
fn boxed_arguments() {
    let t = Tensor::from_slice(&[true, false, true], &[3]).unwrap();
    let args = vec![
        EValue::from(t.clone()),
        EValue::from(vec![Some(t.clone()), None]),
        EValue::from(2_i64),
        EValue::None,
    ];
    let metas = to_meta(&args).unwrap();
    assert_meta_of(&t, metas[0].as_tensor());
    assert_meta_of(&t, metas[1].as_optional_tensor_list()[0].as_ref().unwrap());
    assert!(metas[1].as_optional_tensor_list()[1].is_none());
    assert_eq!(metas[2].as_i64(), 2);
    assert!(metas[3].is_none());
}

#[test]
fn dynamic_shapes() {
    let batch = SymInt::symbolic(Symbol::new(0), Some(16));
    let t = empty_strided_meta_symint(
        &[batch, SymInt::new(8)],
        &[SymInt::new(8), SymInt::new(1)],
        Some(ScalarType::Float),
        None,
        None,
        None,
    )
    .unwrap();
    let m = to_meta(&t).unwrap();
    assert_meta_of(&t, &m);
    assert_eq!(m.sym_sizes()[0], batch);
    assert_eq!(m.sym_sizes()[0].hint(), Some(16));
}

#[test]
fn meta_redispatch() {
    let keys = DispatchKeySet::from_keys(&[
        DispatchKey::Meta,
        DispatchKey::Functionalize,
        DispatchKey::FuncTorchDynamicLayerFrontMode,
        DispatchKey::FuncTorchGradWrapper,
    ]);
    let t = Tensor::from_slice(&[1.0_f32; 6], &[3, 2]).unwrap();

    let dispatched = infer_meta(&t, |meta| {
        assert!(meta.is_meta());
        Ok(compute_dispatch_key_set(keys))
    })
    .unwrap();
    assert_eq!(
        dispatched,
        DispatchKeySet::from_keys(&[DispatchKey::Meta, DispatchKey::Functionalize])
    );
    assert_eq!(compute_dispatch_key_set(keys), keys);

    // an enclosing exclusion survives the re-dispatch
    let _outer = ExcludeDispatchKeyGuard::new(DispatchKey::Python);
    infer_meta(&t, |_| Ok(())).unwrap();
    assert!(!compute_dispatch_key_set(DispatchKey::Python.into()).has(DispatchKey::Python));
    assert!(compute_dispatch_key_set(keys).has_any(EXCLUDE_KEYS_FOR_META_DISPATCH));
}

#[test]
fn concurrent_projection_and_mask_reads() {
    let t = Tensor::from_slice(&[1_i64, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                assert_eq!(EXCLUDE_KEYS_FOR_META_DISPATCH.len(), 9);
                assert_meta_of(&t, &to_meta(&t).unwrap());
            });
        }
    });
}
