//! The species classes of the dataset.
//!
//! Class indices are positions in [SPECIES], so the mapping between codes
//! and indices is a bijection over `0..NUM_CLASSES`.

use crate::common::*;

/// The number of species classes.
pub const NUM_CLASSES: usize = 33;

/// USDA PLANTS codes and the scientific names they stand for.
pub static SPECIES: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    let species: IndexMap<_, _> = [
        ("ACPE", "Acer pensylvanicum L."),
        ("ACRU", "Acer rubrum L."),
        ("ACSA3", "Acer saccharum Marshall"),
        ("AMLA", "Amelanchier laevis Wiegand"),
        ("BETUL", "Betula sp."),
        ("CAGL8", "Carya glabra (Mill.) Sweet"),
        ("CATO6", "Carya tomentosa (Lam.) Nutt."),
        ("FAGR", "Fagus grandifolia Ehrh."),
        ("GOLA", "Gordonia lasianthus (L.) Ellis"),
        ("LITU", "Liriodendron tulipifera L."),
        ("LYLU3", "Lyonia lucida (Lam.) K. Koch"),
        ("MAGNO", "Magnolia sp."),
        ("NYBI", "Nyssa biflora Walter"),
        ("NYSY", "Nyssa sylvatica Marshall"),
        ("OXYDE", "Oxydendrum sp."),
        ("PEPA37", "Persea palustris (Raf.) Sarg."),
        ("PIEL", "Pinus elliottii Engelm."),
        ("PIPA2", "Pinus palustris Mill."),
        ("PINUS", "Pinus sp."),
        ("PITA", "Pinus taeda L."),
        ("PRSE2", "Prunus serotina Ehrh."),
        ("QUAL", "Quercus alba L."),
        ("QUCO2", "Quercus coccinea"),
        ("QUGE2", "Quercus geminata Small"),
        ("QUHE2", "Quercus hemisphaerica W. Bartram ex Willd."),
        ("QULA2", "Quercus laevis Walter"),
        ("QULA3", "Quercus laurifolia Michx."),
        ("QUMO4", "Quercus montana Willd."),
        ("QUNI", "Quercus nigra L."),
        ("QURU", "Quercus rubra L."),
        ("QUERC", "Quercus sp."),
        ("ROPS", "Robinia pseudoacacia L."),
        ("TSCA", "Tsuga canadensis (L.) Carriere"),
    ]
    .into_iter()
    .collect();
    debug_assert_eq!(species.len(), NUM_CLASSES);
    species
});

/// Get the class index of a species code.
pub fn class_index(code: &str) -> Option<usize> {
    SPECIES.get_index_of(code)
}

/// Get the species code of a class index.
pub fn class_code(index: usize) -> Option<&'static str> {
    SPECIES.get_index(index).map(|(code, _)| *code)
}

pub fn scientific_name(code: &str) -> Option<&'static str> {
    SPECIES.get(code).copied()
}
