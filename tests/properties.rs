use std::sync::Arc;

use proptest::prelude::*;

use rpf2d::binning::BinPartition;
use rpf2d::domain::FitConfig;
use rpf2d::morph::{declare_nuisance, interpolate};
use rpf2d::node::Node;
use rpf2d::params::ParameterStore;
use rpf2d::transfer::TransferFunction;

fn fit(json: &str) -> FitConfig {
    serde_json::from_str(json).unwrap()
}

fn families() -> Vec<FitConfig> {
    let default = r#""DEFAULT": {"NOMINAL": 0.0, "MIN": -10, "MAX": 10}"#;
    vec![
        fit(&format!(r#"{{"SPLITPOLY": {{"XORDER": 2, "YORDER": 1}}, {default}}}"#)),
        fit(&format!(r#"{{"POLY": {{"XORDER": 2, "YORDER": 2}}, {default}}}"#)),
        fit(&format!(r#"{{"BASIS": {{"XORDER": 2, "YORDER": 1}}, {default}}}"#)),
        fit(&format!(r#"{{"FORM": "@0 + @1*x - @2*y*x", {default}}}"#)),
    ]
}

proptest! {
    #[test]
    fn partition_index_round_trip(
        nbins in 1usize..60,
        blind in proptest::option::of((0usize..60, 1usize..20)),
    ) {
        let window = blind
            .map(|(start, len)| (start % nbins, len))
            .filter(|&(start, len)| start + len <= nbins)
            .map(|(start, len)| (start as f64, (start + len) as f64));
        let p = BinPartition::build(
            0.0,
            nbins as f64,
            nbins,
            window.map(|w| w.0),
            window.map(|w| w.1),
        )
        .unwrap();
        let covered: usize = p.categories().iter().map(|c| c.n_bins()).sum();
        prop_assert_eq!(covered, nbins);
        for g in 1..=nbins {
            let (cat, local) = p.category_of(g).unwrap();
            prop_assert_eq!(p.global_index_of(cat, local).unwrap(), g);
        }
    }

    #[test]
    fn transfer_function_is_positive(
        coeffs in proptest::collection::vec(-10.0f64..10.0, 12),
        x in 0.0f64..=1.0,
        y in 0.0f64..=1.0,
    ) {
        for cfg in families() {
            let mut store = ParameterStore::new();
            let tf = TransferFunction::build(&cfg, "SR", "", &mut store).unwrap();
            for (handle, c) in tf.parameters().iter().zip(&coeffs) {
                store.set_value(handle.name(), *c).unwrap();
            }
            let v = tf.evaluate(x, y).value(&store).unwrap();
            prop_assert!(v > 0.0, "{} gave {v} at ({x}, {y})", tf.family().tag());
            prop_assert!(v >= tf.epsilon());
        }
    }

    #[test]
    fn shape_morph_boundaries(
        nominal in prop_oneof![-100.0f64..-0.01, 0.01f64..100.0],
        up in -100.0f64..100.0,
        down in -100.0f64..100.0,
    ) {
        let mut store = ParameterStore::new();
        let nu = Arc::new(Node::leaf(declare_nuisance(&mut store, "theta").unwrap()));
        let node = interpolate("m", nu, nominal, up, down).unwrap();

        prop_assert_eq!(node.value(&store).unwrap(), nominal);

        store.set_value("theta", 1.0).unwrap();
        let at_up = node.value(&store).unwrap();
        let rel = (at_up - nominal) / nominal;
        prop_assert!((rel - (up - nominal) / nominal).abs() <= 1e-9 * (1.0 + rel.abs()));

        store.set_value("theta", -1.0).unwrap();
        let at_down = node.value(&store).unwrap();
        prop_assert!((at_down - down).abs() <= 1e-9 * (1.0 + down.abs()));
    }
}
