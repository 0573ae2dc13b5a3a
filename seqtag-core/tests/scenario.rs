use std::sync::Arc;

use seqtag_core::corpus::{chunked_corpus, get_corpus, tagged_corpus};
use seqtag_core::{
    ChainBuilder, Chunker, SeqTagError, Tagger, TrainConfig, UnambiguousConfig, Vocabulary,
};

#[test]
fn test_the_dog_jumped() {
    let tagger = Tagger::standard(Vocabulary::brown(), UnambiguousConfig::default())
        .train(&tagged_corpus())
        .unwrap();
    let chunker = Chunker::new(Vocabulary::conll_chunk())
        .unwrap()
        .train(&chunked_corpus().unwrap())
        .unwrap();

    let tagged = tagger.tag(&["The", "dog", "jumped", "."]);
    assert_eq!(tagged.tags(), vec!["AT", "NN", "VBD", "."]);

    let chunked = chunker.chunk(&tagged);
    assert_eq!(chunked.to_string(), "[NP The/AT dog/NN] [VP jumped/VBD] ./.");
    let kinds: Vec<Option<&str>> = chunked.iter().map(|p| p.kind()).collect();
    assert_eq!(kinds, vec![Some("NP"), Some("VP"), None]);
}

#[test]
fn test_the_dog_jumped_after_one_pass() {
    let annotated = &get_corpus()[0];
    assert_eq!(annotated.text, "The dog jumped.");
    let once = TrainConfig::default().with_passes(1);

    let tagger = Tagger::perceptron(Vocabulary::brown())
        .train_with(&[annotated.tagged()], &once)
        .unwrap();
    let chunker = Chunker::new(Vocabulary::conll_chunk())
        .unwrap()
        .train_with(&[annotated.chunked().unwrap()], &once)
        .unwrap();

    let tagged = tagger.tag(&["The", "dog", "jumped", "."]);
    assert_eq!(tagged.tags(), vec!["AT", "NN", "VBD", "."]);
    let chunked = chunker.chunk(&tagged);
    assert_eq!(chunked.to_string(), "[NP The/AT dog/NN] [VP jumped/VBD] ./.");
}

#[test]
fn test_chain_training_isolation() {
    let corpus = tagged_corpus();
    // limiares baixos para que o atalho realmente capture palavras
    let shortcut = UnambiguousConfig {
        min_frequency: 2,
        min_ratio: 0.9,
    };
    let chained = Tagger::standard(Vocabulary::brown(), shortcut).train(&corpus).unwrap();
    let alone = Tagger::perceptron(Vocabulary::brown()).train(&corpus).unwrap();

    let chained_model = chained.stages()[1].as_perceptron().unwrap();
    let alone_model = alone.stages()[0].as_perceptron().unwrap();
    assert!(!alone_model.weights().is_empty());
    assert_eq!(chained_model.weights(), alone_model.weights());
}

#[test]
fn test_cycle_rejection() {
    let mut chain = ChainBuilder::new(Vocabulary::brown());
    let lexicon = chain.lexicon([("the", "AT")]).unwrap();
    let model = chain.perceptron();
    chain.link(lexicon, model).unwrap();
    let err = chain.link(model, lexicon).unwrap_err();
    assert!(matches!(err, SeqTagError::CyclicTaggerChain { .. }));
}

#[test]
fn test_untrained_default_is_deterministic() {
    let tagger = Tagger::perceptron(Vocabulary::brown());
    let first = tagger.tag(&["Colorless", "green", "ideas"]);
    for _ in 0..5 {
        assert_eq!(tagger.tag(&["Colorless", "green", "ideas"]), first);
    }
    assert!(first.tags().iter().all(|t| *t == "UNK"));
}

#[test]
fn test_tagger_round_trip() {
    let tagger = Tagger::standard(Vocabulary::brown(), UnambiguousConfig::default())
        .train_with(&tagged_corpus(), &TrainConfig::default().with_shuffle_seed(7))
        .unwrap();
    let restored = Tagger::deserialize(Vocabulary::brown(), &tagger.serialize().unwrap()).unwrap();

    for sentence in tagged_corpus() {
        let words = sentence.words();
        assert_eq!(restored.tag(&words), tagger.tag(&words));
    }
    let unseen = ["Mary", "read", "a", "strange", "letter", "."];
    assert_eq!(restored.tag(&unseen), tagger.tag(&unseen));
}

#[test]
fn test_chunker_round_trip() {
    let chunker = Chunker::new(Vocabulary::conll_chunk())
        .unwrap()
        .train(&chunked_corpus().unwrap())
        .unwrap();
    let bytes = chunker.serialize().unwrap();
    let restored = Chunker::deserialize(Vocabulary::conll_chunk(), &bytes).unwrap();
    for sentence in chunked_corpus().unwrap() {
        let tagged = sentence.to_tagged();
        assert_eq!(restored.chunk(&tagged), chunker.chunk(&tagged));
    }
}

#[test]
fn test_deserialize_with_smaller_vocabulary_fails() {
    let tagger = Tagger::perceptron(Vocabulary::brown()).train(&tagged_corpus()).unwrap();
    let bytes = tagger.serialize().unwrap();
    let penn = Arc::new(Vocabulary::penn());
    let err = Tagger::deserialize(penn, &bytes).unwrap_err();
    assert!(matches!(err, SeqTagError::UnknownLabel { .. }));
}

#[test]
fn test_deserialize_garbage_is_malformed() {
    for bytes in [&b""[..], b"{}", b"not json", br#"{"format":"seqtag-model"}"#] {
        assert!(matches!(
            Tagger::deserialize(Vocabulary::brown(), bytes),
            Err(SeqTagError::MalformedModel(_))
        ));
    }
}

#[test]
fn test_training_fit_on_corpus() {
    let corpus = tagged_corpus();
    let tagger = Tagger::perceptron(Vocabulary::brown()).train(&corpus).unwrap();
    let accuracy = tagger.evaluate(&corpus);
    assert!(accuracy.ratio() > 0.9, "{accuracy}");

    let chunks = chunked_corpus().unwrap();
    let chunker = Chunker::new(Vocabulary::conll_chunk()).unwrap().train(&chunks).unwrap();
    let accuracy = chunker.evaluate(&chunks);
    assert!(accuracy.ratio() > 0.9, "{accuracy}");
}

#[test]
fn test_batch_tagging_matches_sequential() {
    let tagger = Tagger::perceptron(Vocabulary::brown()).train(&tagged_corpus()).unwrap();
    let corpus = tagged_corpus();
    let sentences: Vec<Vec<&str>> = corpus.iter().map(|s| s.words()).collect();
    let batch = tagger.tag_batch(&sentences);
    for (words, tagged) in sentences.iter().zip(&batch) {
        assert_eq!(&tagger.tag(words), tagged);
    }
}
