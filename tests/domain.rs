use als_spot_toolbox::domain::{DatasetPath, DerivedDataset, find_derived, strip_extension};

const SAMPLES: &[&str] = &[
    "20130713_185717_Chilarchaea_quellon_F_9053427_IKI_",
    "hmwood/20130713_185717_Chilarchaea_quellon_F_9053427_IKI_",
    "scan.h5.h5",
    "",
    "/",
    "a/b/c",
    "  spaced  ",
];

#[test]
fn extension_is_irrelevant_to_resolution() {
    for sample in SAMPLES {
        let with = format!("{sample}.h5");
        assert_eq!(
            DatasetPath::resolve(&with, None, "me"),
            DatasetPath::resolve(strip_extension(&with), None, "me"),
            "sample {sample:?}"
        );
    }
}

#[test]
fn separator_splits_user_and_file() {
    for (user, file) in [("hmwood", "scan_01"), ("hsbarnard", "2015_sample"), ("u", "f")] {
        let path = DatasetPath::resolve(&format!("{user}/{file}"), None, "me");
        assert_eq!(path.username(), user);
        assert_eq!(path.filename(), file);
    }
}

#[test]
fn resolution_is_total() {
    for sample in SAMPLES {
        let path = DatasetPath::resolve(sample, None, "me");
        assert!(!path.username().is_empty(), "sample {sample:?}");
    }
}

#[test]
fn derived_lookup_deserializes_portal_records() {
    let derived: Vec<DerivedDataset> = serde_json::from_str(
        r#"[
            {"path": "/als/bl832/hmwood/s/sino/s-sino.h5"},
            {"path": "/als/bl832/hmwood/s/gridrec/s-gridrec.h5", "stage": "tape"}
        ]"#,
    )
    .unwrap();

    let gridrec = find_derived(&derived, "gridrec").unwrap();
    assert_eq!(gridrec.extra["stage"], "tape");
    assert!(find_derived(&derived, "norm").is_none());
    assert!(find_derived(&derived, "grid").is_none());
}
