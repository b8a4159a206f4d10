use std::{fs, path::Path};

use clap::Parser;
use float_cmp::assert_approx_eq;
#[cfg(test)] use pretty_assertions::assert_eq;

fn write_file(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).expect("Failed to write fixture");
    path.to_str().expect("utf-8 path").to_string()
}

/// One-hot genotype probability matrix: one row per site.
fn geno_matrix(sites: &[&[usize]]) -> String {
    let mut out = String::new();
    for genos in sites {
        let row: Vec<&str> = genos
            .iter()
            .map(|geno| match geno {
                0 => "1 0 0",
                1 => "0 1 0",
                _ => "0 0 1",
            })
            .collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}

fn run(args: &[&str]) {
    let cli = parser::Cli::parse_from([&["ngsld-rs"][..], args].concat());
    ngsld_rs::run(cli).expect("run should succeed");
}

fn fields(line: &str) -> Vec<&str> {
    line.split('\t').collect()
}

#[test]
fn fully_linked_pair_end_to_end() {
    let tmpdir = tempfile::tempdir().unwrap();
    let genos: &[usize] = &[0, 0, 0, 1, 1, 1, 2, 2, 2, 0, 1, 2];
    let geno = write_file(tmpdir.path(), "linked.geno", &geno_matrix(&[genos, genos]));
    let pos = write_file(tmpdir.path(), "linked.pos", "chr1\t100\nchr1\t200\n");
    let out = tmpdir.path().join("linked.ld");

    run(&[
        "--geno", &geno, "--pos", &pos, "--n-ind", "12", "--n-sites", "2",
        "--probs", "--pearson", "--out", out.to_str().unwrap(),
    ]);

    let output = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 1);

    let fields = fields(lines[0]);
    assert_eq!(fields[0], "chr1:100");
    assert_eq!(fields[1], "chr1:200");
    assert_eq!(fields[2], "100"); // distance in bp.
    assert_eq!(fields[3], "12");  // individuals used.
    let r2: f64 = fields[6].parse().unwrap();
    let pearson: f64 = fields[8].parse().unwrap();
    assert_approx_eq!(f64, r2, 1.0, epsilon = 1e-4);
    assert_approx_eq!(f64, pearson, 1.0, epsilon = 1e-9);
    assert_eq!(fields[9], "ok");
}

#[test]
fn distance_window_bounds_the_pair_list() {
    let tmpdir = tempfile::tempdir().unwrap();
    let sites: Vec<Vec<usize>> = (0..4)
        .map(|site| (0..8).map(|ind| (site + ind) % 3).collect())
        .collect();
    let rows: Vec<&[usize]> = sites.iter().map(Vec::as_slice).collect();
    let geno = write_file(tmpdir.path(), "window.geno", &geno_matrix(&rows));
    let pos = write_file(tmpdir.path(), "window.pos", "chr1\t0\nchr1\t10\nchr1\t30\nchr1\t1000\n");
    let out = tmpdir.path().join("window.ld");

    // 0.05 kb window: only the three pairs among the first three sites.
    run(&[
        "--geno", &geno, "--pos", &pos, "--n-ind", "8", "--n-sites", "4",
        "--probs", "--max-kb-dist", "0.05", "--out", out.to_str().unwrap(),
    ]);

    let output = fs::read_to_string(&out).unwrap();
    let got: Vec<(String, String)> = output
        .lines()
        .map(|line| {
            let fields = fields(line);
            (fields[0].to_string(), fields[1].to_string())
        })
        .collect();
    let expected = [("chr1:0", "chr1:10"), ("chr1:0", "chr1:30"), ("chr1:10", "chr1:30")]
        .map(|(a, b)| (a.to_string(), b.to_string()));
    assert_eq!(got, expected);
}

#[test]
fn monomorphic_site_yields_na_not_a_crash() {
    let tmpdir = tempfile::tempdir().unwrap();
    let geno = write_file(
        tmpdir.path(),
        "mono.geno",
        &geno_matrix(&[&[0, 1, 2, 1, 0, 2], &[0, 0, 0, 0, 0, 0]]),
    );
    let out = tmpdir.path().join("mono.ld");

    run(&[
        "--geno", &geno, "--n-ind", "6", "--n-sites", "2",
        "--probs", "--max-kb-dist", "0", "--out", out.to_str().unwrap(),
    ]);

    let output = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 1);

    let fields = fields(lines[0]);
    assert_eq!(fields[6], "NA"); // r2.
    assert_eq!(fields[9], "monomorphic");
}

#[test]
fn min_r2_filters_weak_pairs() {
    let tmpdir = tempfile::tempdir().unwrap();
    // Sites 0 and 1 fully linked; site 2 sits exactly at linkage
    // equilibrium with both (16 individuals in HWE/LE proportions).
    let g_linked: &[usize] = &[0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2];
    let g_indep: &[usize] = &[0, 1, 1, 2, 0, 0, 1, 1, 1, 1, 2, 2, 0, 1, 1, 2];
    let geno = write_file(tmpdir.path(), "filter.geno", &geno_matrix(&[g_linked, g_linked, g_indep]));
    let out = tmpdir.path().join("filter.ld");

    run(&[
        "--geno", &geno, "--n-ind", "16", "--n-sites", "3",
        "--probs", "--max-kb-dist", "0", "--min-r2", "0.5", "--out", out.to_str().unwrap(),
    ]);

    let output = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 1, "only the linked pair should survive --min-r2:\n{output}");
    assert_eq!(fields(lines[0])[..2], ["0", "1"]); // index labels without --pos.
}

#[test]
fn thread_count_does_not_change_the_output() {
    let tmpdir = tempfile::tempdir().unwrap();

    // Deterministic pseudo-random probability rows.
    let mut state: u64 = 42;
    let mut rng = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };
    let (n_ind, n_sites) = (15, 10);
    let mut matrix = String::new();
    for _ in 0..n_sites {
        let mut row = Vec::with_capacity(n_ind * 3);
        for _ in 0..n_ind * 3 {
            row.push(format!("{:.6}", 0.05 + rng()));
        }
        matrix.push_str(&row.join(" "));
        matrix.push('\n');
    }
    let geno = write_file(tmpdir.path(), "threads.geno", &matrix);
    let out_single = tmpdir.path().join("single.ld");
    let out_pooled = tmpdir.path().join("pooled.ld");

    for (out, n_threads) in [(&out_single, "1"), (&out_pooled, "8")] {
        run(&[
            "--geno", &geno, "--n-ind", "15", "--n-sites", "10", "--probs",
            "--max-kb-dist", "0", "--n-threads", n_threads, "--out", out.to_str().unwrap(),
        ]);
    }

    let single = fs::read(&out_single).unwrap();
    let pooled = fs::read(&out_pooled).unwrap();
    assert_eq!(single, pooled, "canonicalized output must not depend on thread count");
}

#[test]
fn cite_short_circuits_the_run() {
    let cli = parser::Cli::parse_from(["ngsld-rs", "--cite"]);
    ngsld_rs::run(cli).expect("--cite must not require any other argument");
}
