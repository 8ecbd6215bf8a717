use super::genome::Genome;
use super::identity::GenomeId;
use crate::error::EvolverError;
use std::collections::HashSet;
use std::ops::Index;

/// One generation: an ordered set of genomes with pairwise distinct ids.
#[derive(Debug, Clone)]
pub struct Population {
    genomes: Vec<Genome>,
}

impl Population {
    pub fn new(genomes: Vec<Genome>) -> Result<Self, EvolverError> {
        let mut seen = HashSet::with_capacity(genomes.len());
        for genome in &genomes {
            if !seen.insert(genome.id()) {
                return Err(EvolverError::DuplicateGenome(genome.id()));
            }
        }
        Ok(Self { genomes })
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Genome> {
        self.genomes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Genome> {
        self.genomes.iter()
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn ids(&self) -> Vec<GenomeId> {
        self.genomes.iter().map(Genome::id).collect()
    }

    pub fn position(&self, id: GenomeId) -> Option<usize> {
        self.genomes.iter().position(|g| g.id() == id)
    }

    /// Genomes still waiting for a rendered image.
    pub fn uncached_count(&self) -> usize {
        self.genomes.iter().filter(|g| !g.has_image()).count()
    }

    /// Mutable access for attaching synthesis results. Ids cannot be changed
    /// through `Genome`'s API, so distinctness holds.
    pub(crate) fn genomes_mut(&mut self) -> &mut [Genome] {
        &mut self.genomes
    }
}

impl Index<usize> for Population {
    type Output = Genome;

    fn index(&self, index: usize) -> &Genome {
        &self.genomes[index]
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Genome;
    type IntoIter = std::slice::Iter<'a, Genome>;

    fn into_iter(self) -> Self::IntoIter {
        self.genomes.iter()
    }
}
