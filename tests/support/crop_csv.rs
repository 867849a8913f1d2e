use std::path::Path;

pub const COLUMNS: [&str; 8] = [
    "N",
    "P",
    "K",
    "temperature",
    "humidity",
    "ph",
    "rainfall",
    "label",
];

pub const CROPS: [&str; 3] = ["rice", "maize", "chickpea"];

const ROWS_PER_CROP: usize = 20;

/// Per-crop `(base, step)` for each feature; crops occupy disjoint ranges on every feature.
fn profile(crop: &str) -> [(f32, f32); 7] {
    match crop {
        "rice" => [
            (80.0, 1.0),
            (40.0, 0.5),
            (38.0, 0.3),
            (22.0, 0.1),
            (80.0, 0.2),
            (6.0, 0.02),
            (200.0, 5.0),
        ],
        "maize" => [
            (40.0, 1.0),
            (60.0, 0.5),
            (18.0, 0.3),
            (28.0, 0.1),
            (60.0, 0.2),
            (5.0, 0.02),
            (60.0, 5.0),
        ],
        _ => [
            (0.0, 1.0),
            (20.0, 0.5),
            (78.0, 0.3),
            (16.0, 0.1),
            (15.0, 0.2),
            (7.2, 0.02),
            (20.0, 1.0),
        ],
    }
}

pub fn crop_rows() -> Vec<([f32; 7], &'static str)> {
    let mut rows = Vec::new();
    for i in 0..ROWS_PER_CROP {
        for crop in CROPS {
            let features = profile(crop).map(|(base, step)| base + step * i as f32);
            rows.push((features, crop));
        }
    }
    rows
}

/// Vector in the middle of `crop`'s range on every feature.
pub fn mid_range(crop: &str) -> [f32; 7] {
    let mid = (ROWS_PER_CROP / 2) as f32;
    profile(crop).map(|(base, step)| base + step * mid + step * 0.5)
}

/// Write the dataset with `columns` in the given order.
pub fn write_csv_with_columns(path: &Path, columns: &[&str]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dataset dir");
    }
    let mut text = columns.join(",");
    text.push('\n');
    for (features, label) in crop_rows() {
        let cells: Vec<String> = columns
            .iter()
            .map(|&column| match COLUMNS.iter().position(|&c| c == column) {
                Some(7) => label.to_string(),
                Some(idx) => features[idx].to_string(),
                None => panic!("unknown column {column}"),
            })
            .collect();
        text.push_str(&cells.join(","));
        text.push('\n');
    }
    std::fs::write(path, text).expect("write dataset");
}

pub fn write_crop_csv(path: &Path) {
    write_csv_with_columns(path, &COLUMNS);
}
