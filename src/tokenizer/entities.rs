//! Named character references and the numeric-reference remap table.
//!
//! This is a curated table of the references seen in the wild markup this
//! tokenizer is pointed at; the exhaustive registry is maintained outside of
//! the tokenizer and can be swapped in behind the same lookup functions.
//! Keys are stored without the leading `&`. A key without a trailing `;` is
//! one of the legacy references that may historically omit it; everything
//! else resolves only with the semicolon.

use phf::phf_map;

static NAMED_REFERENCES: phf::Map<&'static str, &'static str> = phf_map! {
    // XML predefined set
    "amp;" => "&", "amp" => "&", "AMP;" => "&", "AMP" => "&",
    "lt;" => "<", "lt" => "<", "LT;" => "<", "LT" => "<",
    "gt;" => ">", "gt" => ">", "GT;" => ">", "GT" => ">",
    "quot;" => "\"", "quot" => "\"", "QUOT;" => "\"", "QUOT" => "\"",
    "apos;" => "'",

    // Latin-1 supplement
    "nbsp;" => "\u{00A0}", "nbsp" => "\u{00A0}",
    "iexcl;" => "\u{00A1}",
    "cent;" => "\u{00A2}", "cent" => "\u{00A2}",
    "pound;" => "\u{00A3}", "pound" => "\u{00A3}",
    "curren;" => "\u{00A4}",
    "yen;" => "\u{00A5}", "yen" => "\u{00A5}",
    "brvbar;" => "\u{00A6}",
    "sect;" => "\u{00A7}", "sect" => "\u{00A7}",
    "uml;" => "\u{00A8}",
    "copy;" => "\u{00A9}", "copy" => "\u{00A9}",
    "COPY;" => "\u{00A9}", "COPY" => "\u{00A9}",
    "ordf;" => "\u{00AA}",
    "laquo;" => "\u{00AB}", "laquo" => "\u{00AB}",
    "not;" => "\u{00AC}", "not" => "\u{00AC}",
    "shy;" => "\u{00AD}",
    "reg;" => "\u{00AE}", "reg" => "\u{00AE}",
    "REG;" => "\u{00AE}", "REG" => "\u{00AE}",
    "macr;" => "\u{00AF}",
    "deg;" => "\u{00B0}", "deg" => "\u{00B0}",
    "plusmn;" => "\u{00B1}", "plusmn" => "\u{00B1}",
    "sup2;" => "\u{00B2}", "sup2" => "\u{00B2}",
    "sup3;" => "\u{00B3}", "sup3" => "\u{00B3}",
    "acute;" => "\u{00B4}",
    "micro;" => "\u{00B5}", "micro" => "\u{00B5}",
    "para;" => "\u{00B6}", "para" => "\u{00B6}",
    "middot;" => "\u{00B7}", "middot" => "\u{00B7}",
    "cedil;" => "\u{00B8}",
    "sup1;" => "\u{00B9}", "sup1" => "\u{00B9}",
    "ordm;" => "\u{00BA}",
    "raquo;" => "\u{00BB}", "raquo" => "\u{00BB}",
    "frac14;" => "\u{00BC}", "frac14" => "\u{00BC}",
    "frac12;" => "\u{00BD}", "frac12" => "\u{00BD}",
    "frac34;" => "\u{00BE}", "frac34" => "\u{00BE}",
    "iquest;" => "\u{00BF}",
    "times;" => "\u{00D7}", "times" => "\u{00D7}",
    "divide;" => "\u{00F7}", "divide" => "\u{00F7}",

    // Latin letters with diacritics
    "Agrave;" => "\u{00C0}", "Aacute;" => "\u{00C1}", "Acirc;" => "\u{00C2}",
    "Atilde;" => "\u{00C3}", "Auml;" => "\u{00C4}", "Aring;" => "\u{00C5}",
    "AElig;" => "\u{00C6}", "Ccedil;" => "\u{00C7}", "Egrave;" => "\u{00C8}",
    "Eacute;" => "\u{00C9}", "Ecirc;" => "\u{00CA}", "Euml;" => "\u{00CB}",
    "Igrave;" => "\u{00CC}", "Iacute;" => "\u{00CD}", "Icirc;" => "\u{00CE}",
    "Iuml;" => "\u{00CF}", "ETH;" => "\u{00D0}", "Ntilde;" => "\u{00D1}",
    "Ograve;" => "\u{00D2}", "Oacute;" => "\u{00D3}", "Ocirc;" => "\u{00D4}",
    "Otilde;" => "\u{00D5}", "Ouml;" => "\u{00D6}", "Oslash;" => "\u{00D8}",
    "Ugrave;" => "\u{00D9}", "Uacute;" => "\u{00DA}", "Ucirc;" => "\u{00DB}",
    "Uuml;" => "\u{00DC}", "Yacute;" => "\u{00DD}", "THORN;" => "\u{00DE}",
    "szlig;" => "\u{00DF}",
    "agrave;" => "\u{00E0}", "aacute;" => "\u{00E1}", "acirc;" => "\u{00E2}",
    "atilde;" => "\u{00E3}", "auml;" => "\u{00E4}", "aring;" => "\u{00E5}",
    "aelig;" => "\u{00E6}", "ccedil;" => "\u{00E7}", "egrave;" => "\u{00E8}",
    "eacute;" => "\u{00E9}", "ecirc;" => "\u{00EA}", "euml;" => "\u{00EB}",
    "igrave;" => "\u{00EC}", "iacute;" => "\u{00ED}", "icirc;" => "\u{00EE}",
    "iuml;" => "\u{00EF}", "eth;" => "\u{00F0}", "ntilde;" => "\u{00F1}",
    "ograve;" => "\u{00F2}", "oacute;" => "\u{00F3}", "ocirc;" => "\u{00F4}",
    "otilde;" => "\u{00F5}", "ouml;" => "\u{00F6}", "oslash;" => "\u{00F8}",
    "ugrave;" => "\u{00F9}", "uacute;" => "\u{00FA}", "ucirc;" => "\u{00FB}",
    "uuml;" => "\u{00FC}", "yacute;" => "\u{00FD}", "thorn;" => "\u{00FE}",
    "yuml;" => "\u{00FF}",
    "OElig;" => "\u{0152}", "oelig;" => "\u{0153}",
    "Scaron;" => "\u{0160}", "scaron;" => "\u{0161}",
    "Yuml;" => "\u{0178}", "fnof;" => "\u{0192}",

    // Greek
    "Gamma;" => "\u{0393}", "Delta;" => "\u{0394}", "Theta;" => "\u{0398}",
    "Lambda;" => "\u{039B}", "Xi;" => "\u{039E}", "Pi;" => "\u{03A0}",
    "Sigma;" => "\u{03A3}", "Phi;" => "\u{03A6}", "Psi;" => "\u{03A8}",
    "Omega;" => "\u{03A9}",
    "alpha;" => "\u{03B1}", "beta;" => "\u{03B2}", "gamma;" => "\u{03B3}",
    "delta;" => "\u{03B4}", "epsilon;" => "\u{03B5}", "zeta;" => "\u{03B6}",
    "eta;" => "\u{03B7}", "theta;" => "\u{03B8}", "iota;" => "\u{03B9}",
    "kappa;" => "\u{03BA}", "lambda;" => "\u{03BB}", "mu;" => "\u{03BC}",
    "nu;" => "\u{03BD}", "xi;" => "\u{03BE}", "omicron;" => "\u{03BF}",
    "pi;" => "\u{03C0}", "rho;" => "\u{03C1}", "sigma;" => "\u{03C3}",
    "tau;" => "\u{03C4}", "upsilon;" => "\u{03C5}", "phi;" => "\u{03C6}",
    "chi;" => "\u{03C7}", "psi;" => "\u{03C8}", "omega;" => "\u{03C9}",

    // General punctuation and currency
    "ndash;" => "\u{2013}", "mdash;" => "\u{2014}",
    "lsquo;" => "\u{2018}", "rsquo;" => "\u{2019}", "sbquo;" => "\u{201A}",
    "ldquo;" => "\u{201C}", "rdquo;" => "\u{201D}", "bdquo;" => "\u{201E}",
    "dagger;" => "\u{2020}", "Dagger;" => "\u{2021}", "bull;" => "\u{2022}",
    "hellip;" => "\u{2026}", "permil;" => "\u{2030}",
    "prime;" => "\u{2032}", "Prime;" => "\u{2033}",
    "lsaquo;" => "\u{2039}", "rsaquo;" => "\u{203A}",
    "oline;" => "\u{203E}", "frasl;" => "\u{2044}",
    "euro;" => "\u{20AC}", "trade;" => "\u{2122}",

    // Arrows and mathematical operators
    "larr;" => "\u{2190}", "uarr;" => "\u{2191}", "rarr;" => "\u{2192}",
    "darr;" => "\u{2193}", "harr;" => "\u{2194}",
    "forall;" => "\u{2200}", "part;" => "\u{2202}", "exist;" => "\u{2203}",
    "empty;" => "\u{2205}", "nabla;" => "\u{2207}", "isin;" => "\u{2208}",
    "notin;" => "\u{2209}", "ni;" => "\u{220B}", "prod;" => "\u{220F}",
    "sum;" => "\u{2211}", "minus;" => "\u{2212}", "lowast;" => "\u{2217}",
    "radic;" => "\u{221A}", "prop;" => "\u{221D}", "infin;" => "\u{221E}",
    "ang;" => "\u{2220}", "and;" => "\u{2227}", "or;" => "\u{2228}",
    "cap;" => "\u{2229}", "cup;" => "\u{222A}", "int;" => "\u{222B}",
    "there4;" => "\u{2234}", "sim;" => "\u{223C}", "cong;" => "\u{2245}",
    "asymp;" => "\u{2248}", "ne;" => "\u{2260}", "equiv;" => "\u{2261}",
    "le;" => "\u{2264}", "ge;" => "\u{2265}", "sub;" => "\u{2282}",
    "sup;" => "\u{2283}", "nsub;" => "\u{2284}", "sube;" => "\u{2286}",
    "supe;" => "\u{2287}", "oplus;" => "\u{2295}", "otimes;" => "\u{2297}",
    "perp;" => "\u{22A5}", "sdot;" => "\u{22C5}",

    // Named ASCII characters
    "excl;" => "!", "num;" => "#", "dollar;" => "$", "percnt;" => "%",
    "ast;" => "*", "plus;" => "+", "comma;" => ",", "period;" => ".",
    "sol;" => "/", "colon;" => ":", "semi;" => ";", "equals;" => "=",
    "quest;" => "?", "commat;" => "@", "lsqb;" => "[", "bsol;" => "\\",
    "rsqb;" => "]", "Hat;" => "^", "lowbar;" => "_", "grave;" => "`",
    "lcub;" => "{", "verbar;" => "|", "rcub;" => "}",
};

/// Looks up a named reference. `name` excludes the leading `&` but includes
/// the trailing `;` when present in the input.
pub fn named_reference(name: &str) -> Option<&'static str> {
    NAMED_REFERENCES.get(name).copied()
}

/// Returns true when a key of the given name exists in the table
pub fn is_named_reference(name: &str) -> bool {
    NAMED_REFERENCES.contains_key(name)
}

lazy_static::lazy_static! {
    /// Length of the longest key; bounds the lookahead the resolver needs
    pub static ref LONGEST_REFERENCE: usize = {
        NAMED_REFERENCES.keys().map(|key| key.len()).max().unwrap_or(0)
    };
}

/// The numeric-reference remap for the C1 control range: these code points
/// are reinterpreted as their legacy Windows-1252 equivalents.
pub fn c1_replacement(code: u32) -> Option<char> {
    let c = match code {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_and_legacy_forms() {
        assert_eq!(named_reference("amp;"), Some("&"));
        assert_eq!(named_reference("amp"), Some("&"));
        assert_eq!(named_reference("euro;"), Some("\u{20AC}"));
        // euro has no legacy form
        assert_eq!(named_reference("euro"), None);
        // apos resolves only with the semicolon
        assert_eq!(named_reference("apos"), None);
    }

    #[test]
    fn longest_reference_bounds_lookahead() {
        assert!(*LONGEST_REFERENCE >= "frac12;".len());
    }

    #[test]
    fn c1_remap() {
        assert_eq!(c1_replacement(0x80), Some('\u{20AC}'));
        assert_eq!(c1_replacement(0x8C), Some('\u{0152}'));
        assert_eq!(c1_replacement(0x8D), None);
        assert_eq!(c1_replacement(0x41), None);
    }
}
