use crate::caller::Deletion;
use crate::errors::Result;
use std::io::Write;

/// Write each [`Deletion`] as one BEDPE line, per spec.md §6:
/// `chrom  leftBp-1  leftBp  chrom  rightBp  rightBp+1  DEL  length  +  +`
pub fn write_bedpe<W: Write>(writer: &mut W, calls: &[Deletion]) -> Result<()> {
    for call in calls {
        writeln!(
            writer,
            "{chrom}\t{l0}\t{l1}\t{chrom}\t{r0}\t{r1}\tDEL\t{length}\t+\t+",
            chrom = call.reference_name,
            l0 = call.left_bp - 1,
            l1 = call.left_bp,
            r0 = call.right_bp,
            r1 = call.right_bp + 1,
            length = call.length,
        )?;
    }
    Ok(())
}

/// Write a minimal VCFv4.2 file: one `##fileformat` line, an `ALT=<DEL>`
/// meta line, the mandatory column header, then one record per call.
pub fn write_vcf<W: Write>(writer: &mut W, calls: &[Deletion]) -> Result<()> {
    writeln!(writer, "##fileformat=VCFv4.2")?;
    writeln!(writer, "##ALT=<ID=DEL,Description=\"Deletion\">")?;
    writeln!(
        writer,
        "##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Type of structural variant\">"
    )?;
    writeln!(
        writer,
        "##INFO=<ID=SVLEN,Number=1,Type=Integer,Description=\"Difference in length between REF and ALT alleles\">"
    )?;
    writeln!(
        writer,
        "##INFO=<ID=END,Number=1,Type=Integer,Description=\"End position of the variant\">"
    )?;
    writeln!(writer, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")?;
    for call in calls {
        writeln!(
            writer,
            "{chrom}\t{pos}\t.\tN\t<DEL>\t.\tPASS\tSVTYPE=DEL;SVLEN=-{length};END={end}",
            chrom = call.reference_name,
            pos = call.left_bp,
            length = call.length,
            end = call.right_bp,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> Deletion {
        Deletion::new("chr1".to_string(), 99_999, 100_201)
    }

    #[test]
    fn test_bedpe_line_matches_spec_columns() {
        let mut buf = Vec::new();
        write_bedpe(&mut buf, &[call()]).unwrap();
        let line = String::from_utf8(buf).unwrap();
        assert_eq!(
            line,
            "chr1\t99998\t99999\tchr1\t100201\t100202\tDEL\t201\t+\t+\n"
        );
    }

    #[test]
    fn test_vcf_has_required_header_and_info_fields() {
        let mut buf = Vec::new();
        write_vcf(&mut buf, &[call()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("##fileformat=VCFv4.2\n"));
        assert!(text.contains("SVTYPE=DEL;SVLEN=-201;END=100201"));
    }

    #[test]
    fn test_empty_calls_produce_header_only_vcf() {
        let mut buf = Vec::new();
        write_vcf(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 6);
    }
}
