use super::ValueNetwork;

/// Online network plus a frozen target copy.
///
/// The target only changes through [`ValueNetworkPair::sync`], which copies the online
/// parameters; the two never share storage.
#[derive(Clone, Debug)]
pub struct ValueNetworkPair<N: ValueNetwork> {
    online: N,
    target: N,
    syncs: usize,
}

impl<N: ValueNetwork> ValueNetworkPair<N> {
    /// The target starts as an exact copy of `online`.
    pub fn new(online: N) -> Self {
        let target = online.clone();
        ValueNetworkPair { online, target, syncs: 0 }
    }

    pub fn online(&self) -> &N {
        &self.online
    }

    pub fn target(&self) -> &N {
        &self.target
    }

    pub fn online_mut(&mut self) -> &mut N {
        &mut self.online
    }

    pub fn target_mut(&mut self) -> &mut N {
        &mut self.target
    }

    /// Both networks at once, for a training update that evaluates the two.
    pub fn split_mut(&mut self) -> (&mut N, &mut N) {
        (&mut self.online, &mut self.target)
    }

    /// Overwrite the target with the online parameters.
    pub fn sync(&mut self) {
        self.online.clone_parameters_into(&mut self.target);
        self.syncs += 1;
    }

    /// Number of synchronisations since construction.
    pub fn sync_count(&self) -> usize {
        self.syncs
    }
}
