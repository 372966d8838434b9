use matrix_util::common_io::{read_delimited_table, write_lines};
use matrix_util::traits::IoOps;
use nalgebra::DMatrix;

#[test]
fn named_dmatrix_gz_io_test() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("mat.tsv.gz");
    let file = file.to_str().unwrap();

    let xx = DMatrix::<f32>::from_row_slice(2, 3, &[0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    let rows: Vec<Box<str>> = vec!["a".into(), "b".into()];
    let cols: Vec<Box<str>> = vec!["t0".into(), "t1".into(), "t2".into()];

    xx.write_named(file, &rows, &cols, "cell")?;

    let out = DMatrix::<f32>::from_tsv_named(file)?;
    assert_eq!(out.rows, rows);
    assert_eq!(out.cols, cols);
    approx::assert_abs_diff_eq!(out.mat, xx);
    Ok(())
}

#[test]
fn delimited_table_skips_comments_and_checks_width() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("table.tsv");
    let file = file.to_str().unwrap();

    write_lines(&["# comment", "a\tb", "1\t2", "", "3\t4"], file)?;
    let table = read_delimited_table(file, "\t")?;
    assert_eq!(table.column_index("b")?, 1);
    assert_eq!(table.num_rows(), 2);
    assert_eq!(table.rows[1][0].as_ref(), "3");
    assert!(table.column_index("c").is_err());

    write_lines(&["a\tb", "1\t2\t3"], file)?;
    assert!(read_delimited_table(file, "\t").is_err());
    Ok(())
}

#[test]
fn mixed_delimiters_read_as_one_table() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("mixed.txt.gz");
    let file = file.to_str().unwrap();

    write_lines(&["cell,t0\tt1", "a,1\t2", "b\t3,4"], file)?;
    let out = DMatrix::<f32>::read_named(file, &[',', '\t'])?;
    let rows: Vec<Box<str>> = vec!["a".into(), "b".into()];
    assert_eq!(out.rows, rows);
    assert_eq!(out.mat[(1, 0)], 3.0);
    assert_eq!(out.mat[(0, 1)], 2.0);
    Ok(())
}
