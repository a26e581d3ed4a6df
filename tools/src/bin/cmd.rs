// Command line utility for clustering cells from a CSV embedding

use anyhow::{bail, Context, Error};
use cell_cluster::{cluster_cells, CellDataSet, ClusterConfig, ClusterMethod};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use flate2::read::MultiGzDecoder;
use log::info;
use ndarray::Array2;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

fn cli() -> Command {
    Command::new("cell-cluster-cmd")
        .arg(
            Arg::new("INPUT")
                .help("CSV embedding (optionally gzipped): a header row, then a barcode and the coordinates of each cell")
                .required(true)
                .index(1)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("OUT_DIR")
                .help("Output directory")
                .short('o')
                .long("out_dir")
                .default_value(".")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("K")
                .help("Number of nearest neighbors")
                .short('k')
                .default_value("20")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("METHOD")
                .help("Community detection method")
                .short('m')
                .long("method")
                .default_value("leiden")
                .value_parser(["leiden", "louvain"]),
        )
        .arg(
            Arg::new("LOUVAIN_ITER")
                .help("Louvain trials, or Leiden iterations")
                .long("louvain-iter")
                .default_value("1")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("WEIGHT")
                .help("Jaccard-normalize shared-neighbor counts")
                .long("weight")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("RESOLUTION")
                .help("Leiden resolution parameter")
                .short('r')
                .long("resolution")
                .default_value("0.1")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("SEED")
                .help("Random seed")
                .long("seed")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("VERBOSE")
                .help("Log pipeline stages")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue),
        )
}

fn config_from(matches: &ArgMatches) -> Result<ClusterConfig, Error> {
    let mut config = ClusterConfig {
        k: *matches.get_one("K").context("missing k")?,
        louvain_iter: *matches.get_one("LOUVAIN_ITER").context("missing louvain-iter")?,
        weight: matches.get_flag("WEIGHT"),
        resolution_parameter: *matches.get_one("RESOLUTION").context("missing resolution")?,
        method: matches
            .get_one::<String>("METHOD")
            .context("missing method")?
            .parse::<ClusterMethod>()?,
        verbose: matches.get_flag("VERBOSE"),
        ..ClusterConfig::default()
    };
    if let Some(&seed) = matches.get_one::<u64>("SEED") {
        config.random_seed = seed;
    }
    Ok(config)
}

pub fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = cli().get_matches();
    let input: &PathBuf = matches.get_one("INPUT").context("missing input")?;
    let out_dir: &PathBuf = matches.get_one("OUT_DIR").context("missing out_dir")?;
    let config = config_from(&matches)?;

    let mut ds = load_embedding(input)?;
    info!("loaded {} cells from {}", ds.num_cells(), input.display());

    cluster_cells(&mut ds, &config)?;

    create_dir_all(out_dir).with_context(|| out_dir.display().to_string())?;
    write_clusters(&ds, out_dir.join("clusters.csv"))?;

    if let Some(result) = ds.get_aux(config.method.key()) {
        let path = out_dir.join(format!("{}_result.json", config.method.key()));
        let writer = BufWriter::new(File::create(&path).with_context(|| path.display().to_string())?);
        serde_json::to_writer(writer, result)?;
    }

    Ok(())
}

fn open_input(path: &Path) -> Result<Box<dyn Read>, Error> {
    let file = File::open(path).with_context(|| path.display().to_string())?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read a CSV of `barcode,x1,x2,...` rows following a header.
pub fn load_embedding(path: &Path) -> Result<CellDataSet, Error> {
    let mut reader = csv::Reader::from_reader(open_input(path)?);
    let mut barcodes = Vec::new();
    let mut values = Vec::new();
    let mut dims = None;

    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("{}: record {}", path.display(), line + 1))?;
        let mut fields = record.iter();
        let Some(barcode) = fields.next() else {
            continue;
        };
        let row = fields
            .map(|f| f.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("{}: bad coordinate for {}", path.display(), barcode))?;

        match dims {
            None => dims = Some(row.len()),
            Some(d) if d != row.len() => {
                bail!("{}: {} has {} coordinates, expected {}", path.display(), barcode, row.len(), d)
            }
            _ => (),
        }
        barcodes.push(barcode.to_string());
        values.extend(row);
    }

    let embedding = Array2::from_shape_vec((barcodes.len(), dims.unwrap_or(0)), values)?;
    Ok(CellDataSet::new(barcodes, embedding)?)
}

pub fn write_clusters(ds: &CellDataSet, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let labels = ds.clusters().context("dataset has no clusters")?;
    let file = File::create(path).with_context(|| path.display().to_string())?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer.write_record(["Barcode", "Cluster"])?;
    for (barcode, label) in ds.barcodes().iter().zip(labels) {
        writer.write_record([barcode.as_str(), label.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}
