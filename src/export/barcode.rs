//! Code128 encoding
//!
//! Barcodes are encoded with character set B, which covers printable ASCII.
//! The encoded modules are collapsed into bar runs for drawing.

use barcoders::sym::code128::Code128;

/// Set B selector understood by the encoder
const SET_B: char = 'Ɓ';

/// One dark bar, in modules from the left edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub start: usize,
    pub width: usize,
}

/// An encoded barcode ready to draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBarcode {
    pub text: String,
    pub modules: usize,
    pub bars: Vec<Bar>,
}

/// Encode `data` as Code128 set B. Empty or non-ASCII data cannot be encoded.
pub fn encode_code128(data: &str) -> anyhow::Result<EncodedBarcode> {
    let data = data.trim();
    if data.is_empty() {
        anyhow::bail!("empty barcode");
    }
    if !data.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        anyhow::bail!("barcode {:?} contains characters outside Code128 set B", data);
    }

    let code = Code128::new(format!("{}{}", SET_B, data))
        .map_err(|e| anyhow::anyhow!("cannot encode {:?}: {}", data, e))?;
    let modules = code.encode();

    Ok(EncodedBarcode {
        text: data.to_string(),
        modules: modules.len(),
        bars: bar_runs(&modules),
    })
}

fn bar_runs(modules: &[u8]) -> Vec<Bar> {
    let mut bars = Vec::new();
    let mut run_start = None;
    for (i, &m) in modules.iter().enumerate() {
        match (m == 1, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                bars.push(Bar {
                    start,
                    width: i - start,
                });
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        bars.push(Bar {
            start,
            width: modules.len() - start,
        });
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_collapse_adjacent_modules() {
        let bars = bar_runs(&[1, 1, 0, 1, 0, 0, 1, 1, 1]);
        assert_eq!(
            bars,
            vec![
                Bar { start: 0, width: 2 },
                Bar { start: 3, width: 1 },
                Bar { start: 6, width: 3 },
            ]
        );
    }

    #[test]
    fn default_barcodes_encode() {
        let encoded = encode_code128("BC-00M0001").unwrap();
        assert_eq!(encoded.text, "BC-00M0001");
        assert_eq!(encoded.bars[0].start, 0);
        let last = encoded.bars[encoded.bars.len() - 1];
        assert_eq!(last.start + last.width, encoded.modules);
    }

    #[test]
    fn unencodable_barcodes_are_errors() {
        assert!(encode_code128("  ").is_err());
        assert!(encode_code128("條碼").is_err());
    }
}
