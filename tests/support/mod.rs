pub mod crop_csv;
