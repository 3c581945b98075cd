//! PDBQT ligand I/O: a record-oriented parser for the rotatable-bond tree
//! and the writer that substitutes pose coordinates back into the original
//! textual envelope.
//!
//! Atom records are fixed-column (1-based): serial at 7-11, coordinates at
//! 31-38 / 39-46 / 47-54 and the AutoDock type at 77-79. Keyword records
//! (`ROOT`, `BRANCH x y`, `TORSDOF n`, ...) are free-form. Anything else
//! (`REMARK`, `WARNING`, `TER`) is dropped, while structural and atom lines
//! are retained verbatim for output.

use crate::core::models::atom::{Atom, AutoDockType};
use crate::core::models::frame::Frame;
use crate::core::models::ligand::Ligand;
use crate::core::models::pose::Pose;
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdbqtError {
    #[error("I/O error on '{file}': {source}", file = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse '{file}', line {line}: {kind}", file = path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        kind: PdbqtParseErrorKind,
    },
}

#[derive(Debug, Error)]
pub enum PdbqtParseErrorKind {
    #[error("atom type '{0}' is not supported")]
    UnknownAtomType(String),
    #[error("the ROOT frame contains no heavy atoms")]
    EmptyRoot,
    #[error("an empty BRANCH was detected; the input structure is probably invalid")]
    EmptyBranch,
    #[error("BRANCH/ENDBRANCH nesting does not balance back to the ROOT")]
    UnmatchedBranch,
    #[error("malformed record: {0}")]
    Malformed(String),
}

fn parse_error(path: &Path, line: usize, kind: PdbqtParseErrorKind) -> PdbqtError {
    PdbqtError::Parse {
        path: path.to_path_buf(),
        line,
        kind,
    }
}

/// 0-based column slice, trimmed; `None` when the line is too short.
fn text_field(line: &str, start: usize, end: usize) -> Option<&str> {
    let end = end.min(line.len());
    if start >= end {
        return None;
    }
    line.get(start..end).map(str::trim)
}

fn float_field(
    line: &str,
    start: usize,
    end: usize,
    what: &str,
    path: &Path,
    line_num: usize,
) -> Result<f64, PdbqtError> {
    text_field(line, start, end)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            parse_error(
                path,
                line_num,
                PdbqtParseErrorKind::Malformed(format!("{what} is missing or not numeric")),
            )
        })
}

fn serial_field(
    line: &str,
    start: usize,
    end: usize,
    what: &str,
    path: &Path,
    line_num: usize,
) -> Result<usize, PdbqtError> {
    text_field(line, start, end)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            parse_error(
                path,
                line_num,
                PdbqtParseErrorKind::Malformed(format!("{what} is missing or not an integer")),
            )
        })
}

/// Parses a ligand from a PDBQT stream. `origin` is only used to label
/// errors with the source file.
pub fn read_ligand<R: BufRead>(reader: R, origin: &Path) -> Result<Ligand, PdbqtError> {
    let mut frames = vec![Frame::root()];
    let mut lines: Vec<String> = Vec::with_capacity(200);
    let mut current = 0usize;
    let mut num_active_torsions = 0usize;
    let mut line_count = 0usize;

    for line in reader.lines() {
        let line = line.map_err(|source| PdbqtError::Io {
            path: origin.to_path_buf(),
            source,
        })?;
        line_count += 1;
        let line_num = line_count;

        if line.starts_with("ATOM") || line.starts_with("HETATM") {
            let ad_str = text_field(&line, 77, 79).ok_or_else(|| {
                parse_error(
                    origin,
                    line_num,
                    PdbqtParseErrorKind::Malformed("atom type columns 77-79 are missing".into()),
                )
            })?;
            let ad: AutoDockType = ad_str.parse().map_err(|_| {
                parse_error(
                    origin,
                    line_num,
                    PdbqtParseErrorKind::UnknownAtomType(ad_str.to_string()),
                )
            })?;
            let x = float_field(&line, 30, 38, "x coordinate", origin, line_num)?;
            let y = float_field(&line, 38, 46, "y coordinate", origin, line_num)?;
            let z = float_field(&line, 46, 54, "z coordinate", origin, line_num)?;
            let atom = Atom::new(ad, Point3::new(x, y, z));

            let frame = &mut frames[current];
            if atom.is_hydrogen() {
                // A polar hydrogen marks the hetero atom it is bonded to as
                // a donor; scan the frame's heavy atoms most-recent first.
                if atom.is_polar_hydrogen() {
                    for heavy in frame.heavy_atoms.iter_mut().rev() {
                        if !heavy.is_hetero() {
                            continue;
                        }
                        if atom.is_neighbor(heavy) {
                            heavy.donorize();
                            break;
                        }
                    }
                }
                frame.hydrogens.push(atom);
            } else {
                let serial = serial_field(&line, 6, 11, "atom serial", origin, line_num)?;
                frame.serials.push(serial);
                frame.heavy_atoms.push(atom);
            }
            lines.push(line);
        } else if line.starts_with("ENDBRANCH") {
            if current == 0 {
                return Err(parse_error(
                    origin,
                    line_num,
                    PdbqtParseErrorKind::UnmatchedBranch,
                ));
            }
            let is_last = current == frames.len() - 1;
            let frame = &mut frames[current];
            if frame.heavy_atoms.is_empty() {
                return Err(parse_error(
                    origin,
                    line_num,
                    PdbqtParseErrorKind::EmptyBranch,
                ));
            }
            // A leaf holding only rotor Y (plus hydrogens) has a torsion
            // with no effect on scoring, e.g. -OH or -NH2.
            if is_last && frame.heavy_atoms.len() == 1 {
                frame.active = false;
            } else {
                num_active_torsions += 1;
            }
            current = frame.parent;
            lines.push(line);
        } else if line.starts_with("BRANCH") {
            let x = serial_field(&line, 6, 10, "BRANCH rotor X serial", origin, line_num)?;
            let rotor_x = frames[current]
                .serials
                .iter()
                .position(|&s| s == x)
                .ok_or_else(|| {
                    parse_error(
                        origin,
                        line_num,
                        PdbqtParseErrorKind::Malformed(format!(
                            "BRANCH rotor X serial {x} is not a heavy atom of the enclosing frame"
                        )),
                    )
                })?;
            frames.push(Frame::branch(current, rotor_x));
            current = frames.len() - 1;
            lines.push(line);
        } else if line.starts_with("ROOT")
            || line.starts_with("ENDROOT")
            || line.starts_with("TORSDOF")
        {
            lines.push(line);
        }
        // Any other record (REMARK, WARNING, TER, ...) is dropped.
    }

    if current != 0 {
        return Err(parse_error(
            origin,
            line_count,
            PdbqtParseErrorKind::UnmatchedBranch,
        ));
    }
    if frames[0].heavy_atoms.is_empty() {
        return Err(parse_error(
            origin,
            line_count,
            PdbqtParseErrorKind::EmptyRoot,
        ));
    }

    Ok(Ligand::assemble(frames, lines, num_active_torsions))
}

impl Ligand {
    /// Parses a ligand from a PDBQT file on disk.
    pub fn from_path(path: &Path) -> Result<Self, PdbqtError> {
        let file = File::open(path).map_err(|source| PdbqtError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        read_ligand(BufReader::new(file), path)
    }
}

/// Writes the top `num_models` poses as `MODEL`/`ENDMDL` blocks, rewriting
/// the coordinate columns of the retained atom lines and passing every
/// other retained line through unchanged.
pub fn write_models<W: Write>(
    writer: &mut W,
    ligand: &Ligand,
    poses: &[Pose],
    num_models: usize,
) -> io::Result<()> {
    debug_assert!(num_models <= poses.len());

    for (m, pose) in poses.iter().take(num_models).enumerate() {
        writeln!(writer, "MODEL     {:>4}", m + 1)?;
        writeln!(
            writer,
            "REMARK     PREDICTED FREE ENERGY:{:8.3} KCAL/MOL",
            pose.energy
        )?;
        let mut frame = 0usize;
        let mut heavy = 0usize;
        let mut hydrogen = 0usize;
        for line in &ligand.lines {
            if line.starts_with("ATOM") || line.starts_with("HETATM") {
                // Column 78 is 'H' exactly for the hydrogen types H and HD.
                let coordinate = if line.as_bytes()[77] == b'H' {
                    let c = pose.hydrogens[frame][hydrogen];
                    hydrogen += 1;
                    c
                } else {
                    let c = pose.heavy_atoms[frame][heavy];
                    heavy += 1;
                    c
                };
                writeln!(
                    writer,
                    "{}{:8.3}{:8.3}{:8.3}{}",
                    &line[..30],
                    coordinate.x,
                    coordinate.y,
                    coordinate.z,
                    &line[54..]
                )?;
            } else {
                writeln!(writer, "{}", line)?;
                // Frames were created in BRANCH order, so the cursor walks
                // them in arena order.
                if line.starts_with("BRANCH") {
                    frame += 1;
                    heavy = 0;
                    hydrogen = 0;
                }
            }
        }
        writeln!(writer, "ENDMDL")?;
    }
    Ok(())
}
