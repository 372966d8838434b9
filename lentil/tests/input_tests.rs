use lentil::input::SampleTables;
use matrix_util::common_io::write_lines;

struct Files {
    _dir: tempfile::TempDir,
    coord: String,
    edge: String,
    count: String,
}

fn two_sample_files(edge_lines: &[&str], count_lines: &[&str]) -> anyhow::Result<Files> {
    let dir = tempfile::tempdir()?;
    let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();
    let (coord, edge, count) = (path("xy.tsv.gz"), path("edges.tsv"), path("counts.tsv.gz"));

    write_lines(
        &[
            "sample\tcell\tx\ty",
            "a\tu\t0\t0",
            "b\tu\t5\t5",
            "a\tv\t2\t0",
            "a\tw\t2\t4",
        ],
        &coord,
    )?;
    write_lines(edge_lines, &edge)?;
    write_lines(count_lines, &count)?;

    Ok(Files {
        _dir: dir,
        coord,
        edge,
        count,
    })
}

const EDGES: [&str; 4] = [
    "sample\tsrc\ttgt\tdistance",
    "a\tu\tv\t2",
    "a\tv\tw\t4",
    "b\tu\tu\t0",
];

const COUNTS: [&str; 5] = [
    "sample\tcell\tg0\tg1",
    "a\tw\t0\t0",
    "a\tu\t1\t2",
    "b\tu\t9\t9",
    "a\tv\t3\t1",
];

#[test]
fn read_one_sample_in_coordinate_order() -> anyhow::Result<()> {
    let f = two_sample_files(&EDGES, &COUNTS)?;
    let tables = SampleTables::read(&f.coord, &f.edge, &f.count, "a")?;

    let cells: Vec<&str> = tables.cells.iter().map(|c| c.as_ref()).collect();
    assert_eq!(cells, vec!["u", "v", "w"]);
    assert_eq!(tables.coordinates[(2, 1)], 4.0);

    assert_eq!(tables.edges.len(), 2);
    assert_eq!((tables.edges[1].src, tables.edges[1].tgt), (1, 2));
    assert_eq!(tables.edges[1].distance, 4.0);

    // count rows follow the coordinate order, not the file order
    assert_eq!(tables.counts.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0]);
    assert_eq!(tables.counts.row(2).sum(), 0.0);
    assert_eq!(tables.feature_names.len(), 2);
    Ok(())
}

#[test]
fn write_then_read_keeps_the_sample() -> anyhow::Result<()> {
    let f = two_sample_files(&EDGES, &COUNTS)?;
    let tables = SampleTables::read(&f.coord, &f.edge, &f.count, "a")?;

    let dir = tempfile::tempdir()?;
    let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();
    let (coord, edge, count) = (path("c.tsv.gz"), path("e.tsv.gz"), path("n.tsv.gz"));
    tables.write(&coord, &edge, &count)?;

    let again = SampleTables::read(&coord, &edge, &count, "a")?;
    assert_eq!(again.cells, tables.cells);
    assert_eq!(again.edges, tables.edges);
    assert_eq!(again.counts, tables.counts);
    assert_eq!(again.coordinates, tables.coordinates);
    Ok(())
}

#[test]
fn unknown_or_missing_cells_are_fatal() -> anyhow::Result<()> {
    let bad_edges = ["sample\tsrc\ttgt\tdistance", "a\tu\tz\t1"];
    let f = two_sample_files(&bad_edges, &COUNTS)?;
    assert!(SampleTables::read(&f.coord, &f.edge, &f.count, "a").is_err());

    let short_counts = ["sample\tcell\tg0", "a\tu\t1", "a\tv\t2"];
    let f = two_sample_files(&EDGES, &short_counts)?;
    assert!(SampleTables::read(&f.coord, &f.edge, &f.count, "a").is_err());

    let negative = ["sample\tcell\tg0", "a\tu\t1", "a\tv\t-2", "a\tw\t0"];
    let f = two_sample_files(&EDGES, &negative)?;
    assert!(SampleTables::read(&f.coord, &f.edge, &f.count, "a").is_err());

    let f = two_sample_files(&EDGES, &COUNTS)?;
    assert!(SampleTables::read(&f.coord, &f.edge, &f.count, "c").is_err());
    Ok(())
}
