extern crate parser;

#[macro_use]
extern crate log;

use anyhow::Result;

pub fn cite() {
    // If this ever becomes bloated, consider using the 'indoc' crate.
    const CITATIONS: &str = r###"
    If you plan to use ngsLD-rs in your work, please cite the original
    publication describing the method:

        1. Fox EA, Wright AE, Fumagalli M, Vieira FG. ngsLD: evaluating
           linkage disequilibrium using genotype likelihoods.
           Bioinformatics. 2019; 35(19):3855-3856.
           https://doi.org/10.1093/bioinformatics/btz200

    "###;
    println!("{CITATIONS}");
}

/// Validate the parsed command line arguments and run the pairwise LD
/// estimation engine.
pub fn run(mut cli: parser::Cli) -> Result<()> {
    if cli.cite {
        cite();
        return Ok(())
    }

    // ----------------------------- Normalize & validate arguments.
    cli.normalize();
    cli.check()?;

    // ----------------------------- Run the pairwise engine.
    let summary = ld_from_glf::run(&cli)?;
    info!("Done! ({} pairs written)", summary.n_emitted);
    Ok(())
}
