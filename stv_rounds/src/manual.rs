/*!

This is the long-form manual for `stv_rounds` and `stvtab`.

## Counting rules

The count follows these steps, one round at a time:

1. The quota is computed once, before the first round:
   `floor(ballots / (seats + 1)) + 1` (Droop quota). Only ballots with at
   least one preference are counted.
2. Every ballot counts for its highest ranked candidate that is still
   standing, at its current weight (1 at the start).
3. Every standing candidate with at least `quota - precision` votes is elected.
   Candidates elected in the same round are listed by decreasing votes.
4. The surplus of each newly elected candidate (`votes - quota`) is
   transferred: all its ballots move to their next standing preference, at
   their weight multiplied by `surplus / votes`. When the surplus is within the
   precision, the ballots stay with the elected candidate.
5. The count stops when all the seats are filled. If the standing candidates
   are not more numerous than the seats left, they are all elected.
6. When nobody was elected in the round, the standing candidate with the
   fewest votes is eliminated and its ballots move on at full weight.

A ballot that has no standing preference left is exhausted. Gaps in the ranks
of a ballot are skipped.

### Tie-breaks

Candidates whose totals are within the precision are tied.

* `lexicographic`: the name that sorts first is picked, both to eliminate a
  candidate and to order simultaneous winners.
* `random`: names are ordered by the SHA-256 hash of the seed and the name. The
  same seed always gives the same order.

## Input format

`stvtab` reads normalized preference records: one row per ballot and ranked
candidate.

```text
ballot_id,candidate,rank
b1,Alice,1
b1,Bob,2
b2,Bob,1
```

The rows of a ballot do not need to be adjacent. Rows with an empty candidate
are skipped. Both CSV files (`csv`) and Excel workbooks (`xlsx`) are accepted.

## Configuration

```json
{
  "outputSettings": {
    "contestName": "City council",
    "contestDate": "2024-11-05",
    "contestJurisdiction": "Springfield",
    "contestOffice": "Council"
  },
  "ballotSources": [
    {
      "provider": "csv",
      "filePath": "ballots.csv",
      "ballotIdColumn": 1,
      "candidateColumn": 2,
      "rankColumn": 3,
      "firstRowIndex": 2
    }
  ],
  "rules": {
    "numberOfWinners": 2,
    "quotaMethod": "droop",
    "surplusMethod": "gregory",
    "decimalPrecision": "0.000001",
    "tiebreakMode": "lexicographic",
    "maxRankingsAllowed": 10
  }
}
```

Notes for `ballotSources`:
 - the column indexes start at 1 and may be numbers or strings. By default,
   the columns are 1, 2 and 3.
 - `firstRowIndex` is the first row with data. It defaults to 2 (one header
   row). Rows are the line numbers of the file (or the row numbers of the
   worksheet): blank lines count.
 - `excelWorksheetName` (optional) selects the worksheet of an Excel file. The
   first worksheet is used otherwise.
 - the paths are relative to the directory of the configuration file.

Notes for `rules`:
 - `quotaMethod`: only `droop` is supported.
 - `surplusMethod`: `fractional`, `gregory` and `droop-surplus-first` all
   select the one-shot fractional transfer. `meek` is not supported.
 - `tiebreakMode`: `lexicographic` or `random`. `random` requires `randomSeed`
   (a non-negative integer, as a number or a string).
 - `maxRankingsAllowed`: records with a higher rank are rejected when reading.
 - `decimalPrecision` must be below `1 / (numberOfWinners + 1)`. A coarser
   precision would let more candidates than seats reach the quota.

 */
